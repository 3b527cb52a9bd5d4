//! In-process storage backend.
//!
//! Data lives in the connector, not in the connections, so it survives a
//! dropped connection just like a real server would. The connector also
//! exposes failure-injection knobs (unreachable databases, connect latency)
//! and counts connect attempts per database.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ConnectionError, GatewayError, GatewayResult, SchemaBindError};
use crate::schema::DocumentSchema;
use crate::store::{
    CollectionName, CollectionStore, Connection, Connector, DatabaseName, Document, DocumentId,
    ID_FIELD,
};

#[derive(Default)]
struct MemoryDatabase {
    collections: DashMap<CollectionName, Arc<MemoryCollection>>,
}

/// Connector for the in-process backend.
#[derive(Default)]
pub struct MemoryConnector {
    databases: DashMap<DatabaseName, Arc<MemoryDatabase>>,
    attempts: DashMap<DatabaseName, usize>,
    unreachable: DashSet<DatabaseName>,
    latency_ms: AtomicU64,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every connect by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Make connects to `database` fail (or succeed again).
    pub fn set_unreachable(&self, database: &DatabaseName, unreachable: bool) {
        if unreachable {
            self.unreachable.insert(database.clone());
        } else {
            self.unreachable.remove(database);
        }
    }

    /// Number of connect attempts made for `database`, failed ones included.
    pub fn connect_attempts(&self, database: &DatabaseName) -> usize {
        self.attempts.get(database).map(|r| *r.value()).unwrap_or(0)
    }

    /// Number of documents currently stored in a collection.
    pub fn document_count(&self, database: &DatabaseName, collection: &CollectionName) -> usize {
        self.databases
            .get(database)
            .and_then(|db| db.collections.get(collection).map(|c| c.len()))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self, database: &DatabaseName) -> Result<Arc<dyn Connection>, ConnectionError> {
        *self.attempts.entry(database.clone()).or_insert(0) += 1;

        // Handshake, then verify: two sequential halves of the configured latency.
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            let half = Duration::from_millis(latency / 2);
            tokio::time::sleep(half).await;
            tokio::time::sleep(Duration::from_millis(latency) - half).await;
        }

        if self.unreachable.contains(database) {
            return Err(ConnectionError::Connect {
                database: database.to_string(),
                message: "server unreachable".into(),
            });
        }

        let data = self
            .databases
            .entry(database.clone())
            .or_default()
            .value()
            .clone();

        Ok(Arc::new(MemoryConnection {
            database: database.clone(),
            data,
        }))
    }
}

struct MemoryConnection {
    database: DatabaseName,
    data: Arc<MemoryDatabase>,
}

#[async_trait]
impl Connection for MemoryConnection {
    fn database(&self) -> &DatabaseName {
        &self.database
    }

    async fn bind_collection(
        &self,
        collection: &CollectionName,
        _schema: &DocumentSchema,
    ) -> Result<Arc<dyn CollectionStore>, SchemaBindError> {
        let store: Arc<dyn CollectionStore> = self
            .data
            .collections
            .entry(collection.clone())
            .or_default()
            .value()
            .clone();
        Ok(store)
    }
}

#[derive(Default)]
struct MemoryCollection {
    documents: Mutex<Vec<Document>>,
}

impl MemoryCollection {
    fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    fn with_documents<T>(&self, f: impl FnOnce(&mut Vec<Document>) -> T) -> GatewayResult<T> {
        let mut docs = self
            .documents
            .lock()
            .map_err(|_| GatewayError::Unknown("collection lock poisoned".into()))?;
        Ok(f(&mut docs))
    }
}

fn has_id(doc: &Document, id: &str) -> bool {
    matches!(doc.get(ID_FIELD), Some(Value::String(s)) if s == id)
}

#[async_trait]
impl CollectionStore for MemoryCollection {
    async fn find_all(&self) -> GatewayResult<Vec<Document>> {
        self.with_documents(|docs| docs.clone())
    }

    async fn insert_many(&self, documents: Vec<Document>) -> GatewayResult<Vec<DocumentId>> {
        self.with_documents(|docs| {
            documents
                .into_iter()
                .map(|mut doc| {
                    let id = DocumentId::generate();
                    doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
                    docs.push(doc);
                    id
                })
                .collect()
        })
    }

    async fn find_by_id_and_delete(&self, id: &DocumentId) -> GatewayResult<Option<Document>> {
        let id = id.to_hex();
        self.with_documents(|docs| {
            docs.iter()
                .position(|doc| has_id(doc, &id))
                .map(|index| docs.remove(index))
        })
    }

    async fn find_by_id_and_update(
        &self,
        id: &DocumentId,
        changes: Document,
    ) -> GatewayResult<Option<Document>> {
        let id = id.to_hex();
        self.with_documents(|docs| {
            docs.iter_mut().find(|doc| has_id(doc, &id)).map(|doc| {
                doc.extend(changes);
                doc.clone()
            })
        })
    }
}
