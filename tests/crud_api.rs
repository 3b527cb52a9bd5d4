//! End-to-end CRUD behavior against the memory backend.

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use db_gateway::config::schema::SchemaConfig;

mod common;

fn apple() -> Value {
    json!({"item": "apple", "food_group": "fruits", "price_in_usd": 1.2, "quantity": 10})
}

#[tokio::test]
async fn test_insert_then_scan_returns_the_document() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();

    let inserted = client.insert_one("Test", "Items", apple()).await.unwrap();
    let documents = client.find("Test", "Items").await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["_id"], json!(inserted.id));
    assert_eq!(documents[0]["item"], "apple");
    assert_eq!(documents[0]["food_group"], "fruits");
    assert_eq!(documents[0]["price_in_usd"], 1.2);
    assert_eq!(documents[0]["quantity"], 10);
}

#[tokio::test]
async fn test_insert_status_is_created() {
    let gw = common::start_gateway(common::memory_config()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/insert/Test/Items", gw.url))
        .json(&json!({ "document": apple() }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"].as_str().unwrap().len(), 24);
}

#[tokio::test]
async fn test_invalid_document_is_rejected_before_storage() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();

    let mut document = apple();
    document.as_object_mut().unwrap().remove("food_group");

    let err = client.insert_one("Test", "Items", document).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.kind(), Some("validation_error"));
    assert_eq!(gw.document_count("Test", "Items"), 0);

    let err = client
        .insert_one("Test", "Items", json!({"item": "kale", "food_group": "leafy", "price_in_usd": 2, "quantity": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    let err = client
        .insert_one("Test", "Items", json!({"item": "kale", "food_group": "vegetables", "price_in_usd": -1, "quantity": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(gw.document_count("Test", "Items"), 0);
}

#[tokio::test]
async fn test_unknown_fields_are_stripped() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();

    let mut document = apple();
    document["color"] = json!("red");
    client.insert_one("Test", "Items", document).await.unwrap();

    let documents = client.find("Test", "Items").await.unwrap();
    assert!(documents[0].get("color").is_none());
}

#[tokio::test]
async fn test_insert_many_is_all_or_nothing() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();

    let mut pear = apple();
    pear["item"] = json!("pear");
    let inserted = client
        .insert_many("Test", "Items", vec![apple(), pear])
        .await
        .unwrap();
    assert_eq!(inserted.count, 2);
    assert_eq!(inserted.ids.len(), 2);

    let err = client
        .insert_many("Test", "Items", vec![apple(), json!({"item": "broken"})])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(gw.document_count("Test", "Items"), 2);

    let err = client.insert_many("Test", "Items", Vec::new()).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn test_insert_body_shapes() {
    let gw = common::start_gateway(common::memory_config()).await;
    let http = reqwest::Client::new();
    let url = format!("{}/insert/Test/Items", gw.url);

    // `document` takes precedence over `documents`.
    let res = http
        .post(&url)
        .json(&json!({ "document": apple(), "documents": [apple(), apple()] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert!(body.get("id").is_some());
    assert_eq!(gw.document_count("Test", "Items"), 1);

    let res = http.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_delete_returns_document_and_missing_is_not_found() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();
    let inserted = client.insert_one("Test", "Items", apple()).await.unwrap();

    let err = client
        .delete("Test", "Items", "0123456789abcdef01234567")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.kind(), Some("not_found"));
    assert_eq!(gw.document_count("Test", "Items"), 1);
    assert_eq!(gw.gateway.accessors.len(), 1);

    let deleted = client.delete("Test", "Items", &inserted.id).await.unwrap();
    assert_eq!(deleted["item"], "apple");
    assert_eq!(gw.document_count("Test", "Items"), 0);
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();

    let err = client.delete("Test", "Items", "not-an-id").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    let err = client
        .update("Test", "Items", "xyz", json!({"quantity": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    // Rejected before any connection is opened.
    assert_eq!(gw.connect_attempts("Test"), 0);
}

#[tokio::test]
async fn test_update_merges_present_fields_only() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();
    let inserted = client.insert_one("Test", "Items", apple()).await.unwrap();

    let updated = client
        .update("Test", "Items", &inserted.id, json!({"quantity": 3}))
        .await
        .unwrap();
    assert_eq!(updated["quantity"], 3);
    assert_eq!(updated["item"], "apple");
    assert_eq!(updated["price_in_usd"], 1.2);

    let err = client
        .update("Test", "Items", &inserted.id, json!({"food_group": "candy"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    let err = client
        .update("Test", "Items", &inserted.id, json!({"_id": "0123456789abcdef01234567"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    let err = client
        .update("Test", "Items", "0123456789abcdef01234567", json!({"quantity": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

    let documents = client.find("Test", "Items").await.unwrap();
    assert_eq!(documents[0]["quantity"], 3);
    assert_eq!(documents[0]["food_group"], "fruits");
}

#[tokio::test]
async fn test_bad_names_are_rejected() {
    let gw = common::start_gateway(common::memory_config()).await;
    let http = reqwest::Client::new();

    for path in ["/find/bad$db/Items", "/find/my%20db/Items", "/find/Test/system.users"] {
        let res = http.get(format!("{}{}", gw.url, path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "validation_error");
    }

    assert!(gw.gateway.connections.is_empty());
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();

    client.insert_one("Test", "Items", apple()).await.unwrap();
    client.insert_one("Shop", "Items", apple()).await.unwrap();
    client.insert_one("Test", "Stock", apple()).await.unwrap();

    assert_eq!(client.find("Test", "Items").await.unwrap().len(), 1);
    assert_eq!(client.find("Shop", "Items").await.unwrap().len(), 1);
    assert_eq!(client.find("Test", "Other").await.unwrap().len(), 0);
    assert_eq!(gw.connect_attempts("Test"), 1);
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let gw = common::start_gateway(common::memory_config()).await;
    let http = reqwest::Client::new();

    let res = http.get(format!("{}/health", gw.url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());

    let res = http
        .get(format!("{}/health", gw.url))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_admin_registry_and_eviction() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();
    client.find("Test", "Items").await.unwrap();
    client.find("Test", "Stock").await.unwrap();

    let registry = client.registry().await.unwrap();
    assert_eq!(registry["databases"], json!(["Test"]));
    assert_eq!(registry["accessors"].as_array().unwrap().len(), 2);
    assert_eq!(registry["accessors"][0]["schema"], "inventory");

    let status = client.status().await.unwrap();
    assert_eq!(status["backend"], "memory");
    assert_eq!(status["connections"], 1);
    assert_eq!(status["accessors"], 2);

    assert!(client.evict("Test", "Items").await.unwrap());
    assert!(!client.evict("Test", "Items").await.unwrap());

    let status = client.status().await.unwrap();
    assert_eq!(status["connections"], 1);
    assert_eq!(status["accessors"], 1);
}

#[tokio::test]
async fn test_admin_routes_can_be_disabled() {
    let mut config = common::memory_config();
    config.admin.enabled = false;
    let gw = common::start_gateway(config).await;

    let err = gw.client().status().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_schema_reload_applies_to_new_accessors() {
    let config = common::memory_config();
    let gw = common::start_gateway(config.clone()).await;
    let client = gw.client();

    let err = client
        .insert_one("Test", "Notes", json!({"text": "hello"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    let mut reloaded = config;
    reloaded.schemas = SchemaConfig {
        default_schema: "inventory".into(),
        ..SchemaConfig::default()
    };
    reloaded.schemas.bindings.insert("Notes".into(), "none".into());
    gw.config_tx.send(reloaded).unwrap();

    let client = &client;
    let accepted = common::eventually(Duration::from_secs(2), || async move {
        client
            .insert_one("Test", "Notes", json!({"text": "hello"}))
            .await
            .is_ok()
    })
    .await;
    assert!(accepted);
    assert_eq!(gw.connect_attempts("Test"), 1);
}
