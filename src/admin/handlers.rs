use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::GatewayResult;
use crate::http::handlers::CollectionPath;
use crate::http::server::AppState;
use crate::store::CollectionKey;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub backend: &'static str,
    pub uptime_secs: u64,
    pub connections: usize,
    pub accessors: usize,
    pub schemas: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessorEntry {
    pub database: String,
    pub collection: String,
    pub schema: String,
}

#[derive(Debug, Serialize)]
pub struct RegistrySnapshot {
    pub databases: Vec<String>,
    pub accessors: Vec<AccessorEntry>,
}

#[derive(Debug, Serialize)]
pub struct Eviction {
    pub evicted: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let gateway = &state.gateway;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        backend: gateway.connections.backend_kind(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        connections: gateway.connections.len(),
        accessors: gateway.accessors.len(),
        schemas: gateway.accessors.catalog().schema_names(),
    })
}

pub async fn get_registry(State(state): State<AppState>) -> Json<RegistrySnapshot> {
    let gateway = &state.gateway;
    let databases = gateway
        .connections
        .databases()
        .into_iter()
        .map(|db| db.to_string())
        .collect();

    // An entry evicted between listing and lookup is skipped.
    let accessors = gateway
        .accessors
        .keys()
        .into_iter()
        .filter_map(|key| {
            let accessor = gateway.accessors.cached(&key)?;
            Some(AccessorEntry {
                database: key.database.to_string(),
                collection: key.collection.to_string(),
                schema: accessor.schema().name().to_string(),
            })
        })
        .collect();

    Json(RegistrySnapshot {
        databases,
        accessors,
    })
}

/// Drop the accessor for one (database, collection). The connection stays.
pub async fn evict_accessor(
    State(state): State<AppState>,
    Path(path): Path<CollectionPath>,
) -> GatewayResult<Json<Eviction>> {
    let key = CollectionKey::parse(&path.database, &path.collection)?;
    let evicted = state.gateway.accessors.invalidate(&key);
    Ok(Json(Eviction { evicted }))
}
