//! Schema catalog: which schema applies to which collection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::SchemaConfig;
use crate::error::SchemaBindError;
use crate::schema::{DocumentSchema, INVENTORY, SCHEMALESS};
use crate::store::CollectionKey;

/// Immutable snapshot of the configured schemas.
///
/// Lookup order for a key: `"database.collection"` binding, then
/// `"collection"` binding, then the default schema.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schemas: HashMap<String, Arc<DocumentSchema>>,
    bindings: HashMap<String, String>,
    default_schema: String,
}

impl SchemaCatalog {
    pub fn from_config(config: &SchemaConfig) -> Self {
        let mut schemas: HashMap<String, Arc<DocumentSchema>> = HashMap::new();
        schemas.insert(INVENTORY.to_string(), Arc::new(DocumentSchema::inventory()));
        schemas.insert(SCHEMALESS.to_string(), Arc::new(DocumentSchema::schemaless()));

        for (name, definition) in &config.definitions {
            schemas.insert(
                name.clone(),
                Arc::new(DocumentSchema::new(name.clone(), definition.clone())),
            );
        }

        Self {
            schemas,
            bindings: config
                .bindings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            default_schema: config.default_schema.clone(),
        }
    }

    /// Schema bound to `key`.
    pub fn resolve(&self, key: &CollectionKey) -> Result<Arc<DocumentSchema>, SchemaBindError> {
        let schema_name = self
            .bindings
            .get(&key.to_string())
            .or_else(|| self.bindings.get(key.collection.as_str()))
            .unwrap_or(&self.default_schema);

        self.schemas
            .get(schema_name)
            .cloned()
            .ok_or_else(|| SchemaBindError::UnknownSchema {
                collection: key.to_string(),
                schema: schema_name.clone(),
            })
    }

    pub fn contains(&self, schema: &str) -> bool {
        self.schemas.contains_key(schema)
    }

    pub fn schema_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::from_config(&SchemaConfig::default())
    }
}
