//! Storage backends behind the registries.
//!
//! # Data Flow
//! ```text
//! Connector::connect(database)          → Arc<dyn Connection>     (Connection Registry)
//!     → Connection::bind_collection()   → Arc<dyn CollectionStore> (Accessor Registry)
//!         → find_all / insert_many / find_by_id_and_delete / find_by_id_and_update
//! ```
//!
//! # Design Decisions
//! - Backends see documents that already passed schema validation
//! - Documents cross the boundary as JSON objects; `_id` is a hex string
//! - `MongoConnector` talks to a real server, `MemoryConnector` keeps
//!   everything in-process for tests and local runs

pub mod memory;
pub mod mongo;
pub mod names;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{ConnectionError, GatewayResult, SchemaBindError};
use crate::schema::DocumentSchema;

pub use memory::MemoryConnector;
pub use mongo::MongoConnector;
pub use names::{CollectionKey, CollectionName, DatabaseName, DocumentId};

/// A stored or to-be-stored document.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Primary key field name.
pub const ID_FIELD: &str = "_id";

/// Opens connections to named databases.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Short backend name for logs and status output.
    fn kind(&self) -> &'static str;

    async fn connect(&self, database: &DatabaseName) -> Result<Arc<dyn Connection>, ConnectionError>;
}

/// A live connection to one database.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    fn database(&self) -> &DatabaseName;

    /// Prepare a collection for use under the given schema.
    async fn bind_collection(
        &self,
        collection: &CollectionName,
        schema: &DocumentSchema,
    ) -> Result<Arc<dyn CollectionStore>, SchemaBindError>;
}

/// Primitive CRUD over one collection.
#[async_trait]
pub trait CollectionStore: Send + Sync + 'static {
    async fn find_all(&self) -> GatewayResult<Vec<Document>>;

    /// Insert documents in order, returning their generated ids.
    async fn insert_many(&self, documents: Vec<Document>) -> GatewayResult<Vec<DocumentId>>;

    async fn find_by_id_and_delete(&self, id: &DocumentId) -> GatewayResult<Option<Document>>;

    /// Merge `changes` into the document and return it as stored afterwards.
    async fn find_by_id_and_update(
        &self,
        id: &DocumentId,
        changes: Document,
    ) -> GatewayResult<Option<Document>>;
}
