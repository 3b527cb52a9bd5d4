//! Multi-tenant HTTP-to-database gateway.
//!
//! CRUD endpoints are parameterized by database and collection name.
//! Connections and schema-bound accessors are opened lazily on first use,
//! cached by name and shared by every later request.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod schema;
pub mod store;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
