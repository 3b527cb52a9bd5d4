//! CRUD handlers.
//!
//! Each handler parses names (and id or body), obtains the accessor for the
//! (database, collection) pair and performs exactly one operation, all under
//! the request's operation deadline.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult, ValidationError};
use crate::http::server::AppState;
use crate::registry::Accessor;
use crate::resilience::{operation_deadline, with_deadline};
use crate::store::{CollectionKey, Document, DocumentId};

#[derive(Debug, Deserialize)]
pub struct CollectionPath {
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentPath {
    pub database: String,
    pub collection: String,
    pub id: String,
}

/// Query parameters accepted by every CRUD route.
#[derive(Debug, Default, Deserialize)]
pub struct OperationParams {
    /// Caller deadline in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Insert body. `document` wins when both are present.
#[derive(Debug, Default, Deserialize)]
pub struct InsertRequest {
    #[serde(default)]
    pub document: Option<Value>,
    #[serde(default)]
    pub documents: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub update: Option<Document>,
}

#[derive(Debug, Serialize)]
pub struct InsertedOne {
    pub id: DocumentId,
}

#[derive(Debug, Serialize)]
pub struct InsertedMany {
    pub ids: Vec<DocumentId>,
    pub count: usize,
}

fn params(query: Result<Query<OperationParams>, QueryRejection>) -> GatewayResult<OperationParams> {
    match query {
        Ok(Query(params)) => Ok(params),
        Err(rejection) => Err(ValidationError::InvalidQuery(rejection.body_text()).into()),
    }
}

fn body<T>(json: Result<Json<T>, JsonRejection>) -> GatewayResult<T> {
    match json {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ValidationError::MalformedBody(rejection.body_text()).into()),
    }
}

/// Acquire the accessor for `key` and run `op` on it, bounded by the
/// operation deadline.
async fn with_accessor<T, F, Fut>(
    state: &AppState,
    params: &OperationParams,
    key: CollectionKey,
    op: F,
) -> GatewayResult<T>
where
    F: FnOnce(Arc<Accessor>) -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let deadline = operation_deadline(params.timeout_ms, &state.timeouts);
    with_deadline(deadline, async {
        let accessor = state.gateway.accessors.acquire_accessor(&key).await?;
        op(accessor).await
    })
    .await
}

/// `GET /find/{database}/{collection}`
pub async fn find(
    State(state): State<AppState>,
    Path(path): Path<CollectionPath>,
    query: Result<Query<OperationParams>, QueryRejection>,
) -> GatewayResult<Json<Vec<Document>>> {
    let params = params(query)?;
    let key = CollectionKey::parse(&path.database, &path.collection)?;

    let documents = with_accessor(&state, &params, key, |accessor| async move {
        accessor.find_all().await
    })
    .await?;
    Ok(Json(documents))
}

/// `POST /insert/{database}/{collection}`
pub async fn insert(
    State(state): State<AppState>,
    Path(path): Path<CollectionPath>,
    query: Result<Query<OperationParams>, QueryRejection>,
    json: Result<Json<InsertRequest>, JsonRejection>,
) -> GatewayResult<Response> {
    let params = params(query)?;
    let key = CollectionKey::parse(&path.database, &path.collection)?;
    let request = body(json)?;

    let (documents, single) = match (request.document, request.documents) {
        (Some(document), _) => (vec![document], true),
        (None, Some(documents)) => (documents, false),
        (None, None) => {
            return Err(ValidationError::MissingBody("'document' or 'documents'").into());
        }
    };

    let ids = with_accessor(&state, &params, key, |accessor| async move {
        accessor.insert(documents).await
    })
    .await?;

    let response = if single {
        match ids.into_iter().next() {
            Some(id) => (StatusCode::CREATED, Json(InsertedOne { id })).into_response(),
            None => return Err(GatewayError::Unknown("insert returned no id".into())),
        }
    } else {
        let count = ids.len();
        (StatusCode::CREATED, Json(InsertedMany { ids, count })).into_response()
    };
    Ok(response)
}

/// `DELETE /delete/{database}/{collection}/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(path): Path<DocumentPath>,
    query: Result<Query<OperationParams>, QueryRejection>,
) -> GatewayResult<Json<Document>> {
    let params = params(query)?;
    let key = CollectionKey::parse(&path.database, &path.collection)?;
    let id = DocumentId::parse(&path.id)?;

    let deleted = with_accessor(&state, &params, key, |accessor| async move {
        accessor.delete_by_id(&id).await
    })
    .await?;
    Ok(Json(deleted))
}

/// `PUT /update/{database}/{collection}/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(path): Path<DocumentPath>,
    query: Result<Query<OperationParams>, QueryRejection>,
    json: Result<Json<UpdateRequest>, JsonRejection>,
) -> GatewayResult<Json<Document>> {
    let params = params(query)?;
    let key = CollectionKey::parse(&path.database, &path.collection)?;
    let id = DocumentId::parse(&path.id)?;
    let changes = body(json)?
        .update
        .ok_or(ValidationError::MissingBody("'update'"))?;

    let updated = with_accessor(&state, &params, key, |accessor| async move {
        accessor.update_by_id(&id, changes).await
    })
    .await?;
    Ok(Json(updated))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_request_shapes() {
        let both: InsertRequest =
            serde_json::from_str(r#"{"document": {"a": 1}, "documents": [{"b": 2}]}"#).unwrap();
        assert!(both.document.is_some());
        assert_eq!(both.documents.unwrap().len(), 1);

        let empty: InsertRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.document.is_none() && empty.documents.is_none());
    }

    #[test]
    fn test_update_request_requires_object() {
        assert!(serde_json::from_str::<UpdateRequest>(r#"{"update": [1, 2]}"#).is_err());

        let ok: UpdateRequest = serde_json::from_str(r#"{"update": {"quantity": 3}}"#).unwrap();
        assert_eq!(ok.update.unwrap()["quantity"], 3);
    }
}
