//! Operational endpoints for inspecting and evicting registry entries.

pub mod handlers;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::http::server::AppState;
use self::handlers::*;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/registry", get(get_registry))
        .route("/admin/registry/{database}/{collection}", delete(evict_accessor))
}
