//! MongoDB storage backend.
//!
//! One driver client per database name: the database is part of the URI
//! rendered from the configured template, so every logical database gets
//! its own connection pool.

use async_trait::async_trait;
use bson::{doc, Bson};
use futures_util::TryStreamExt;
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ConnectionError, GatewayError, GatewayResult, SchemaBindError};
use crate::schema::DocumentSchema;
use crate::store::{
    CollectionName, CollectionStore, Connection, Connector, DatabaseName, Document, DocumentId,
    ID_FIELD,
};

/// Placeholder replaced by the URL-encoded credential.
pub const PASSWORD_PLACEHOLDER: &str = "<PASSWORD>";
/// Placeholder replaced by the database name.
pub const DATABASE_PLACEHOLDER: &str = "<DATABASE>";

const APP_NAME: &str = "db-gateway";

/// Render a connection URI for `database` from the configured template.
pub fn render_uri(
    template: &str,
    password: Option<&str>,
    database: &DatabaseName,
) -> Result<String, ConnectionError> {
    let template = template.trim();
    if template.is_empty() {
        return Err(ConnectionError::Template(
            "no connection URI template configured".into(),
        ));
    }
    if !has_mongodb_scheme(template) {
        return Err(ConnectionError::Template(
            "URI template must use the mongodb:// or mongodb+srv:// scheme".into(),
        ));
    }
    if !template.contains(DATABASE_PLACEHOLDER) {
        return Err(ConnectionError::Template(format!(
            "URI template has no {} placeholder",
            DATABASE_PLACEHOLDER
        )));
    }

    let mut uri = template.to_string();
    if uri.contains(PASSWORD_PLACEHOLDER) {
        let password = password.filter(|p| !p.is_empty()).ok_or_else(|| {
            ConnectionError::Template("URI template expects a password but none is configured".into())
        })?;
        uri = uri.replace(PASSWORD_PLACEHOLDER, &urlencoding::encode(password));
    }
    Ok(uri.replace(DATABASE_PLACEHOLDER, &urlencoding::encode(database.as_str())))
}

/// Whether `template` uses a scheme the driver accepts.
pub fn has_mongodb_scheme(template: &str) -> bool {
    let template = template.trim_start();
    template.starts_with("mongodb://") || template.starts_with("mongodb+srv://")
}

/// Connector backed by the MongoDB driver.
pub struct MongoConnector {
    template: String,
    password: Option<String>,
    server_selection_timeout: Duration,
}

impl MongoConnector {
    pub fn new(template: String, password: Option<String>, server_selection_timeout: Duration) -> Self {
        Self {
            template,
            password,
            server_selection_timeout,
        }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    fn kind(&self) -> &'static str {
        "mongodb"
    }

    async fn connect(&self, database: &DatabaseName) -> Result<Arc<dyn Connection>, ConnectionError> {
        let uri = render_uri(&self.template, self.password.as_deref(), database)?;
        let connect_failed = |e: mongodb::error::Error| ConnectionError::Connect {
            database: database.to_string(),
            message: e.to_string(),
        };

        let mut options = ClientOptions::parse(&uri)
            .await
            .map_err(|e| ConnectionError::Template(format!("invalid connection URI: {}", e.kind)))?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(self.server_selection_timeout);
        options.connect_timeout = Some(self.server_selection_timeout);

        let client = Client::with_options(options).map_err(connect_failed)?;
        let db = client.database(database.as_str());

        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(connect_failed)?;

        info!(database = %database, "Connected to MongoDB");

        Ok(Arc::new(MongoConnection {
            database: database.clone(),
            db,
            _client: client,
        }))
    }
}

struct MongoConnection {
    database: DatabaseName,
    db: Database,
    _client: Client,
}

#[async_trait]
impl Connection for MongoConnection {
    fn database(&self) -> &DatabaseName {
        &self.database
    }

    async fn bind_collection(
        &self,
        collection: &CollectionName,
        schema: &DocumentSchema,
    ) -> Result<Arc<dyn CollectionStore>, SchemaBindError> {
        let inner = self.db.collection::<bson::Document>(collection.as_str());

        let indexes: Vec<IndexModel> = schema
            .indexed_fields()
            .map(|field| {
                let mut keys = bson::Document::new();
                keys.insert(field, 1);
                IndexModel::builder().keys(keys).build()
            })
            .collect();

        if !indexes.is_empty() {
            debug!(collection = %collection, count = indexes.len(), "Creating schema indexes");
            inner
                .create_indexes(indexes)
                .await
                .map_err(|e| SchemaBindError::Backend {
                    collection: format!("{}.{}", self.database, collection),
                    schema: schema.name().to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Arc::new(MongoCollection {
            label: format!("{}.{}", self.database, collection),
            inner,
        }))
    }
}

struct MongoCollection {
    label: String,
    inner: Collection<bson::Document>,
}

impl MongoCollection {
    fn failed(&self, e: mongodb::error::Error) -> GatewayError {
        GatewayError::Unknown(format!("operation on {} failed: {}", self.label, e))
    }
}

fn to_bson(document: &Document) -> GatewayResult<bson::Document> {
    bson::to_document(document)
        .map_err(|e| GatewayError::Unknown(format!("document cannot be stored: {}", e)))
}

/// Convert a stored document to JSON, rendering the object id as hex.
fn to_json(mut document: bson::Document) -> Document {
    let hex_id = match document.get(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => Some(oid.to_hex()),
        _ => None,
    };
    if let Some(hex_id) = hex_id {
        document.insert(ID_FIELD, hex_id);
    }

    match Bson::Document(document).into_relaxed_extjson() {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[async_trait]
impl CollectionStore for MongoCollection {
    async fn find_all(&self) -> GatewayResult<Vec<Document>> {
        let cursor = self.inner.find(doc! {}).await.map_err(|e| self.failed(e))?;
        let documents: Vec<bson::Document> =
            cursor.try_collect().await.map_err(|e| self.failed(e))?;
        Ok(documents.into_iter().map(to_json).collect())
    }

    async fn insert_many(&self, documents: Vec<Document>) -> GatewayResult<Vec<DocumentId>> {
        let mut ids = Vec::with_capacity(documents.len());
        let mut batch = Vec::with_capacity(documents.len());
        for document in &documents {
            let id = DocumentId::generate();
            let mut stored = to_bson(document)?;
            stored.insert(ID_FIELD, id.object_id());
            ids.push(id);
            batch.push(stored);
        }

        self.inner
            .insert_many(batch)
            .await
            .map_err(|e| self.failed(e))?;
        Ok(ids)
    }

    async fn find_by_id_and_delete(&self, id: &DocumentId) -> GatewayResult<Option<Document>> {
        let deleted = self
            .inner
            .find_one_and_delete(doc! { "_id": id.object_id() })
            .await
            .map_err(|e| self.failed(e))?;
        Ok(deleted.map(to_json))
    }

    async fn find_by_id_and_update(
        &self,
        id: &DocumentId,
        changes: Document,
    ) -> GatewayResult<Option<Document>> {
        let filter = doc! { "_id": id.object_id() };

        // An empty $set is rejected by the server.
        let found = if changes.is_empty() {
            self.inner.find_one(filter).await
        } else {
            let set = to_bson(&changes)?;
            self.inner
                .find_one_and_update(filter, doc! { "$set": set })
                .return_document(ReturnDocument::After)
                .await
        };

        Ok(found.map_err(|e| self.failed(e))?.map(to_json))
    }
}
