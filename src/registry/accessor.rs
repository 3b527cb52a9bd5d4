//! Schema-bound accessor over one (database, collection) pair.

use serde_json::Value;
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult, SchemaBindError, ValidationError};
use crate::schema::DocumentSchema;
use crate::store::{CollectionKey, CollectionStore, Connection, Document, DocumentId};

/// Validates documents against its schema and forwards to the backend.
///
/// Immutable once built; shared by every request for the same key.
pub struct Accessor {
    key: CollectionKey,
    schema: Arc<DocumentSchema>,
    connection: Arc<dyn Connection>,
    store: Arc<dyn CollectionStore>,
}

impl Accessor {
    /// Bind `schema` to the key's collection on `connection`.
    pub async fn bind(
        key: CollectionKey,
        connection: Arc<dyn Connection>,
        schema: Arc<DocumentSchema>,
    ) -> Result<Self, SchemaBindError> {
        let store = connection.bind_collection(&key.collection, &schema).await?;
        tracing::debug!(collection = %key, schema = schema.name(), "Schema bound");
        Ok(Self {
            key,
            schema,
            connection,
            store,
        })
    }

    pub fn key(&self) -> &CollectionKey {
        &self.key
    }

    pub fn schema(&self) -> &DocumentSchema {
        &self.schema
    }

    /// The shared connection this accessor was built on.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Every document in the collection.
    pub async fn find_all(&self) -> GatewayResult<Vec<Document>> {
        self.store.find_all().await
    }

    /// Validate all documents, then insert them. Nothing is written if any
    /// document is invalid.
    pub async fn insert(&self, documents: Vec<Value>) -> GatewayResult<Vec<DocumentId>> {
        if documents.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let batch_size = documents.len();
        let validated = documents
            .into_iter()
            .enumerate()
            .map(|(index, document)| {
                self.schema.validate_new(document).map_err(|reason| {
                    if batch_size == 1 {
                        reason
                    } else {
                        ValidationError::InDocument {
                            index,
                            reason: Box::new(reason),
                        }
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ids = self.store.insert_many(validated).await?;
        tracing::debug!(collection = %self.key, count = ids.len(), "Documents inserted");
        Ok(ids)
    }

    /// Delete the document with `id`, returning it.
    pub async fn delete_by_id(&self, id: &DocumentId) -> GatewayResult<Document> {
        self.store
            .find_by_id_and_delete(id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    /// Merge `changes` into the document with `id`, returning the result.
    pub async fn update_by_id(&self, id: &DocumentId, changes: Document) -> GatewayResult<Document> {
        let changes = self.schema.validate_changes(changes)?;
        self.store
            .find_by_id_and_update(id, changes)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    fn not_found(&self, id: &DocumentId) -> GatewayError {
        GatewayError::NotFound {
            collection: self.key.to_string(),
            id: id.to_hex(),
        }
    }
}

impl std::fmt::Debug for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("key", &self.key)
            .field("schema", &self.schema.name())
            .finish()
    }
}
