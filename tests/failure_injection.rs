//! Failure injection: unreachable and slow databases.

use std::time::Duration;

use db_gateway::store::DatabaseName;
use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn test_unreachable_database_is_retried_on_next_request() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();
    let db = DatabaseName::parse("Flaky").unwrap();
    gw.connector.set_unreachable(&db, true);

    let err = client.find("Flaky", "Items").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.kind(), Some("connection_error"));
    assert!(gw.gateway.connections.is_empty());
    assert!(gw.gateway.accessors.is_empty());

    gw.connector.set_unreachable(&db, false);
    let documents = client.find("Flaky", "Items").await.unwrap();
    assert!(documents.is_empty());
    assert_eq!(gw.connect_attempts("Flaky"), 2);
}

#[tokio::test]
async fn test_unreachable_database_does_not_affect_others() {
    let gw = common::start_gateway(common::memory_config()).await;
    let client = gw.client();
    gw.connector
        .set_unreachable(&DatabaseName::parse("Down").unwrap(), true);

    assert!(client.find("Down", "Items").await.is_err());
    assert!(client.find("Up", "Items").await.is_ok());
    assert_eq!(gw.gateway.connections.len(), 1);
}

#[tokio::test]
async fn test_connect_timeout_is_not_cached() {
    let mut config = common::memory_config();
    config.timeouts.connect_secs = 1;
    let gw = common::start_gateway(config).await;
    let client = gw.client();
    gw.connector.set_latency(Duration::from_millis(1500));

    let err = client.find("Slow", "Items").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(gw.gateway.connections.is_empty());

    gw.connector.set_latency(Duration::ZERO);
    assert!(client.find("Slow", "Items").await.is_ok());
    assert_eq!(gw.connect_attempts("Slow"), 2);
}

#[tokio::test]
async fn test_caller_deadline_does_not_poison_the_key() {
    let mut config = common::memory_config();
    config.timeouts.connect_secs = 1;
    let gw = common::start_gateway(config).await;
    gw.connector.set_latency(Duration::from_millis(300));

    let impatient = gw.client().with_timeout_ms(50);
    let err = impatient.find("Test", "Items").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::GATEWAY_TIMEOUT));
    assert_eq!(err.kind(), Some("timeout"));

    // Nobody waits on the creation, yet it completes and is published.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(gw.gateway.connections.len(), 1);
    assert_eq!(gw.gateway.accessors.len(), 1);

    let documents = gw.client().find("Test", "Items").await.unwrap();
    assert!(documents.is_empty());
    assert_eq!(gw.connect_attempts("Test"), 1);
}

#[tokio::test]
async fn test_abandoned_connect_timeout_is_retried_fresh() {
    let mut config = common::memory_config();
    config.timeouts.connect_secs = 1;
    let gw = common::start_gateway(config).await;
    gw.connector.set_latency(Duration::from_millis(1400));

    let impatient = gw.client().with_timeout_ms(50);
    let err = impatient.find("Slow", "Items").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::GATEWAY_TIMEOUT));

    // The abandoned attempt times out on its own and leaves nothing behind.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(gw.gateway.connections.is_empty());

    gw.connector.set_latency(Duration::from_millis(100));
    let documents = gw.client().find("Slow", "Items").await.unwrap();
    assert!(documents.is_empty());
    assert_eq!(gw.connect_attempts("Slow"), 2);
}

#[tokio::test]
async fn test_invalid_timeout_parameter_is_bad_request() {
    let gw = common::start_gateway(common::memory_config()).await;

    let res = reqwest::Client::new()
        .get(format!("{}/find/Test/Items?timeout_ms=soon", gw.url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
