use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stored document, `_id` rendered as a hex string.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertedOne {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertedMany {
    pub ids: Vec<String>,
    pub count: usize,
}

#[derive(Debug)]
pub enum SdkError {
    /// Transport or decoding failure.
    Http(reqwest::Error),
    /// The gateway answered with a non-success status.
    Api { status: StatusCode, body: Value },
}

impl SdkError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SdkError::Http(e) => e.status(),
            SdkError::Api { status, .. } => Some(*status),
        }
    }

    /// The `error` kind from the gateway's error body, if any.
    pub fn kind(&self) -> Option<&str> {
        match self {
            SdkError::Api { body, .. } => body.get("error").and_then(Value::as_str),
            SdkError::Http(_) => None,
        }
    }
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkError::Http(e) => write!(f, "request failed: {}", e),
            SdkError::Api { status, body } => write!(f, "gateway returned {}: {}", status, body),
        }
    }
}

impl std::error::Error for SdkError {}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        SdkError::Http(e)
    }
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
    timeout_ms: Option<u64>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms: None,
        }
    }

    /// Ask the gateway to bound each operation by `timeout_ms`.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    fn url(&self, path: &str) -> String {
        match self.timeout_ms {
            Some(ms) => format!("{}{}?timeout_ms={}", self.base_url, path, ms),
            None => format!("{}{}", self.base_url, path),
        }
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SdkError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(SdkError::Api { status, body });
        }
        Ok(resp.json().await?)
    }

    pub async fn health(&self) -> Result<Value, SdkError> {
        let resp = self.client.get(format!("{}/health", self.base_url)).send().await?;
        Self::decode(resp).await
    }

    /// Every document in `database.collection`.
    pub async fn find(&self, database: &str, collection: &str) -> Result<Vec<Document>, SdkError> {
        let resp = self
            .client
            .get(self.url(&format!("/find/{}/{}", database, collection)))
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Value,
    ) -> Result<InsertedOne, SdkError> {
        let resp = self
            .client
            .post(self.url(&format!("/insert/{}/{}", database, collection)))
            .json(&serde_json::json!({ "document": document }))
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Value>,
    ) -> Result<InsertedMany, SdkError> {
        let resp = self
            .client
            .post(self.url(&format!("/insert/{}/{}", database, collection)))
            .json(&serde_json::json!({ "documents": documents }))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Delete by id, returning the deleted document.
    pub async fn delete(&self, database: &str, collection: &str, id: &str) -> Result<Document, SdkError> {
        let resp = self
            .client
            .delete(self.url(&format!("/delete/{}/{}/{}", database, collection, id)))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Merge `changes` into the document, returning the updated document.
    pub async fn update(
        &self,
        database: &str,
        collection: &str,
        id: &str,
        changes: Value,
    ) -> Result<Document, SdkError> {
        let resp = self
            .client
            .put(self.url(&format!("/update/{}/{}/{}", database, collection, id)))
            .json(&serde_json::json!({ "update": changes }))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Evict a cached accessor through the admin API.
    pub async fn evict(&self, database: &str, collection: &str) -> Result<bool, SdkError> {
        let resp = self
            .client
            .delete(format!("{}/admin/registry/{}/{}", self.base_url, database, collection))
            .send()
            .await?;
        let body: Value = Self::decode(resp).await?;
        Ok(body.get("evicted").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn status(&self) -> Result<Value, SdkError> {
        let resp = self.client.get(format!("{}/admin/status", self.base_url)).send().await?;
        Self::decode(resp).await
    }

    pub async fn registry(&self) -> Result<Value, SdkError> {
        let resp = self.client.get(format!("{}/admin/registry", self.base_url)).send().await?;
        Self::decode(resp).await
    }
}
