//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use db_gateway::config::schema::BackendKind;
use db_gateway::store::{CollectionName, DatabaseName, MemoryConnector};
use db_gateway::{Gateway, GatewayConfig, HttpServer, Shutdown};
use sdk_rust::GatewayClient;

/// A gateway serving the memory backend on an ephemeral port.
#[allow(dead_code)]
pub struct TestGateway {
    pub addr: SocketAddr,
    pub url: String,
    pub connector: Arc<MemoryConnector>,
    pub gateway: Gateway,
    pub config_tx: mpsc::UnboundedSender<GatewayConfig>,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestGateway {
    pub fn client(&self) -> GatewayClient {
        GatewayClient::new(&self.url)
    }

    pub fn connect_attempts(&self, database: &str) -> usize {
        self.connector
            .connect_attempts(&DatabaseName::parse(database).unwrap())
    }

    pub fn document_count(&self, database: &str, collection: &str) -> usize {
        self.connector.document_count(
            &DatabaseName::parse(database).unwrap(),
            &CollectionName::parse(collection).unwrap(),
        )
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn memory_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.database.backend = BackendKind::Memory;
    config.timeouts.connect_secs = 2;
    config
}

/// Start a gateway with `config`. The listener is bound before this
/// returns, so requests can be sent immediately.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let connector = Arc::new(MemoryConnector::new());
    let gateway = Gateway::new(connector.clone(), &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config, gateway.clone());
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        addr,
        url: format!("http://{}", addr),
        connector,
        gateway,
        config_tx,
        shutdown,
    }
}

/// Poll `check` until it returns true or `timeout` passes.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
