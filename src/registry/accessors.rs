//! Accessor Registry: one schema-bound accessor per (database, collection).

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::registry::accessor::Accessor;
use crate::registry::connections::ConnectionRegistry;
use crate::registry::single_flight::{Lookup, SingleFlight};
use crate::schema::SchemaCatalog;
use crate::store::CollectionKey;

/// Lazily builds and caches accessors, composing with the connection registry.
pub struct AccessorRegistry {
    connections: Arc<ConnectionRegistry>,
    catalog: ArcSwap<SchemaCatalog>,
    accessors: SingleFlight<CollectionKey, Arc<Accessor>, GatewayError>,
}

impl AccessorRegistry {
    pub fn new(connections: Arc<ConnectionRegistry>, catalog: SchemaCatalog) -> Self {
        Self {
            connections,
            catalog: ArcSwap::from_pointee(catalog),
            accessors: SingleFlight::new(),
        }
    }

    /// Return the accessor for `key`, building it on first use.
    ///
    /// Propagates `ConnectionError` from the connection registry and
    /// `SchemaBindError` from binding. Failures are not cached.
    pub async fn acquire_accessor(&self, key: &CollectionKey) -> Result<Arc<Accessor>, GatewayError> {
        let connections = self.connections.clone();
        let catalog = self.catalog.load_full();
        let owned_key = key.clone();

        let (outcome, lookup) = self
            .accessors
            .get_or_try_init(key, move || async move {
                let connection = connections.acquire_connection(&owned_key.database).await?;
                let schema = catalog.resolve(&owned_key)?;
                let accessor = Accessor::bind(owned_key, connection, schema).await?;
                Ok(Arc::new(accessor))
            })
            .await;

        match &outcome {
            Ok(accessor) => {
                if lookup == Lookup::Created {
                    tracing::info!(
                        collection = %key,
                        schema = accessor.schema().name(),
                        "Accessor published"
                    );
                    metrics::record_registry_size("accessors", self.accessors.ready_len());
                }
                metrics::record_registry_lookup("accessors", lookup.as_str());
            }
            Err(e) => {
                if lookup == Lookup::Created {
                    tracing::warn!(collection = %key, error = %e, "Accessor creation failed");
                }
                metrics::record_registry_lookup("accessors", "failed");
            }
        }

        outcome
    }

    /// Drop the accessor for `key`. The underlying connection stays open.
    pub fn invalidate(&self, key: &CollectionKey) -> bool {
        let removed = self.accessors.invalidate(key);
        if removed {
            tracing::info!(collection = %key, "Accessor invalidated");
            metrics::record_registry_size("accessors", self.accessors.ready_len());
        }
        removed
    }

    /// Drop every accessor.
    pub fn invalidate_all(&self) {
        self.accessors.clear();
        metrics::record_registry_size("accessors", 0);
        tracing::info!("All accessors invalidated");
    }

    /// Install a new schema catalog. Existing accessors were bound under the
    /// old catalog, so all of them are invalidated.
    pub fn reload_schemas(&self, catalog: SchemaCatalog) {
        self.catalog.store(Arc::new(catalog));
        self.invalidate_all();
    }

    pub fn catalog(&self) -> Arc<SchemaCatalog> {
        self.catalog.load_full()
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Published accessor for `key`, without building one.
    pub fn cached(&self, key: &CollectionKey) -> Option<Arc<Accessor>> {
        self.accessors.get(key)
    }

    /// Keys with a published accessor, sorted.
    pub fn keys(&self) -> Vec<CollectionKey> {
        let mut keys = self.accessors.ready_keys();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.accessors.ready_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
