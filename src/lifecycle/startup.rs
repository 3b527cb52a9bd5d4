//! Startup orchestration.
//!
//! Builds the registries from a validated config, then probes the default
//! (database, collection) so a misconfigured backend fails fast instead of on
//! the first request.

use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{BackendKind, GatewayConfig};
use crate::error::{ConnectionError, GatewayError, GatewayResult};
use crate::registry::{AccessorRegistry, ConnectionRegistry};
use crate::resilience::Backoff;
use crate::schema::SchemaCatalog;
use crate::store::{CollectionKey, Connector, MemoryConnector, MongoConnector};

/// The two registries every request goes through.
#[derive(Clone)]
pub struct Gateway {
    pub connections: Arc<ConnectionRegistry>,
    pub accessors: Arc<AccessorRegistry>,
}

impl Gateway {
    /// Wire registries around an explicit connector.
    pub fn new(connector: Arc<dyn Connector>, config: &GatewayConfig) -> Self {
        let connections = Arc::new(ConnectionRegistry::new(
            connector,
            Duration::from_secs(config.timeouts.connect_secs),
        ));
        let accessors = Arc::new(AccessorRegistry::new(
            connections.clone(),
            SchemaCatalog::from_config(&config.schemas),
        ));
        Self {
            connections,
            accessors,
        }
    }

    /// Wire registries around the connector the config selects.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(build_connector(config), config)
    }
}

/// Connector for the configured backend.
pub fn build_connector(config: &GatewayConfig) -> Arc<dyn Connector> {
    match config.database.backend {
        BackendKind::Mongodb => Arc::new(MongoConnector::new(
            config.database.uri_template.clone(),
            config.database.password.clone(),
            Duration::from_secs(config.timeouts.connect_secs),
        )),
        BackendKind::Memory => Arc::new(MemoryConnector::new()),
    }
}

/// Connection failures other than an unusable URI template may clear up.
fn is_transient(error: &GatewayError) -> bool {
    matches!(error, GatewayError::Connection(e) if !matches!(e, ConnectionError::Template(_)))
}

/// Acquire the default accessor, retrying connection failures with backoff.
///
/// Template, schema and validation failures are not retried; they will not
/// go away.
pub async fn probe_default(gateway: &Gateway, config: &GatewayConfig) -> GatewayResult<()> {
    let key = CollectionKey::parse(
        &config.database.default_database,
        &config.database.default_collection,
    )?;
    let backoff = Backoff::from_config(&config.startup);
    let attempts = config.startup.connect_attempts.max(1);

    let mut attempt = 0;
    loop {
        attempt += 1;
        match gateway.accessors.acquire_accessor(&key).await {
            Ok(accessor) => {
                tracing::info!(
                    collection = %key,
                    schema = accessor.schema().name(),
                    backend = gateway.connections.backend_kind(),
                    "Startup probe succeeded"
                );
                return Ok(());
            }
            Err(e) if attempt < attempts && is_transient(&e) => {
                let delay = backoff.delay(attempt);
                tracing::warn!(
                    collection = %key,
                    attempt,
                    delay = ?delay,
                    error = %e,
                    "Startup probe failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(collection = %key, attempt, error = %e, "Startup probe failed");
                return Err(e);
            }
        }
    }
}
