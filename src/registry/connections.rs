//! Connection Registry: one shared connection per database name.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::ConnectionError;
use crate::observability::metrics;
use crate::registry::single_flight::{Lookup, SingleFlight};
use crate::store::{Connection, Connector, DatabaseName};

/// Lazily opens and caches one connection per database.
pub struct ConnectionRegistry {
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    connections: SingleFlight<DatabaseName, Arc<dyn Connection>, ConnectionError>,
}

impl ConnectionRegistry {
    pub fn new(connector: Arc<dyn Connector>, connect_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
            connections: SingleFlight::new(),
        }
    }

    /// Return the connection for `database`, opening it on first use.
    ///
    /// Cache hits do no I/O. Concurrent first calls share one connect
    /// attempt; a failed or timed-out attempt leaves nothing behind.
    pub async fn acquire_connection(
        &self,
        database: &DatabaseName,
    ) -> Result<Arc<dyn Connection>, ConnectionError> {
        let connector = self.connector.clone();
        let connect_timeout = self.connect_timeout;
        let name = database.clone();

        let (outcome, lookup) = self
            .connections
            .get_or_try_init(database, move || async move {
                tracing::info!(database = %name, backend = connector.kind(), "Opening database connection");
                match timeout(connect_timeout, connector.connect(&name)).await {
                    Ok(result) => result,
                    Err(_) => Err(ConnectionError::Timeout {
                        database: name.to_string(),
                        millis: connect_timeout.as_millis() as u64,
                    }),
                }
            })
            .await;

        match &outcome {
            Ok(_) => {
                if lookup == Lookup::Created {
                    tracing::info!(database = %database, "Database connection published");
                    metrics::record_registry_size("connections", self.connections.ready_len());
                }
                metrics::record_registry_lookup("connections", lookup.as_str());
            }
            Err(e) => {
                if lookup == Lookup::Created {
                    tracing::warn!(database = %database, error = %e, "Database connection failed");
                }
                metrics::record_registry_lookup("connections", "failed");
            }
        }

        outcome
    }

    /// Cached connection for `database`, without connecting.
    pub fn cached(&self, database: &DatabaseName) -> Option<Arc<dyn Connection>> {
        self.connections.get(database)
    }

    /// Names of databases with an open connection, sorted.
    pub fn databases(&self) -> Vec<DatabaseName> {
        let mut names = self.connections.ready_keys();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.connections.ready_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn backend_kind(&self) -> &'static str {
        self.connector.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConnector;

    fn db(name: &str) -> DatabaseName {
        DatabaseName::parse(name).unwrap()
    }

    fn registry() -> (Arc<MemoryConnector>, Arc<ConnectionRegistry>) {
        let connector = Arc::new(MemoryConnector::new());
        let registry = Arc::new(ConnectionRegistry::new(
            connector.clone(),
            Duration::from_secs(1),
        ));
        (connector, registry)
    }

    #[tokio::test]
    async fn concurrent_acquires_open_one_connection() {
        let (connector, registry) = registry();
        connector.set_latency(Duration::from_millis(50));

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry.acquire_connection(&db("Test")).await.unwrap()
            }));
        }
        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(connector.connect_attempts(&db("Test")), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn hit_returns_identical_handle_without_connecting() {
        let (connector, registry) = registry();
        let first = registry.acquire_connection(&db("Test")).await.unwrap();
        let second = registry.acquire_connection(&db("Test")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connect_attempts(&db("Test")), 1);
        assert!(registry.cached(&db("Test")).is_some());
    }

    #[tokio::test]
    async fn distinct_databases_get_distinct_connections() {
        let (_, registry) = registry();
        let a = registry.acquire_connection(&db("A")).await.unwrap();
        let b = registry.acquire_connection(&db("B")).await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.database(), &db("A"));
        assert_eq!(registry.databases(), vec![db("A"), db("B")]);
    }

    #[tokio::test]
    async fn failed_attempt_is_not_cached() {
        let (connector, registry) = registry();
        connector.set_unreachable(&db("Test"), true);

        let err = registry.acquire_connection(&db("Test")).await.err().unwrap();
        assert!(matches!(err, ConnectionError::Connect { .. }));
        assert!(registry.is_empty());

        connector.set_unreachable(&db("Test"), false);
        assert!(registry.acquire_connection(&db("Test")).await.is_ok());
        assert_eq!(connector.connect_attempts(&db("Test")), 2);
    }

    #[tokio::test]
    async fn timed_out_attempt_is_not_cached() {
        let connector = Arc::new(MemoryConnector::new());
        let registry = ConnectionRegistry::new(connector.clone(), Duration::from_millis(20));
        connector.set_latency(Duration::from_millis(200));

        let err = registry.acquire_connection(&db("Slow")).await.err().unwrap();
        assert_eq!(
            err,
            ConnectionError::Timeout {
                database: "Slow".into(),
                millis: 20
            }
        );
        assert!(registry.cached(&db("Slow")).is_none());

        connector.set_latency(Duration::ZERO);
        assert!(registry.acquire_connection(&db("Slow")).await.is_ok());
        assert_eq!(connector.connect_attempts(&db("Slow")), 2);
    }

    #[tokio::test]
    async fn abandoned_connect_finishes_without_waiters() {
        let connector = Arc::new(MemoryConnector::new());
        let registry = ConnectionRegistry::new(connector.clone(), Duration::from_millis(200));
        connector.set_latency(Duration::from_millis(100));

        let key = db("Test");
        let dropped = registry.acquire_connection(&key);
        assert!(tokio::time::timeout(Duration::from_millis(20), dropped).await.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(registry.cached(&db("Test")).is_some());
        assert!(registry.acquire_connection(&db("Test")).await.is_ok());
        assert_eq!(connector.connect_attempts(&db("Test")), 1);
    }

    #[tokio::test]
    async fn abandoned_timeout_leaves_key_retryable() {
        let connector = Arc::new(MemoryConnector::new());
        let registry = ConnectionRegistry::new(connector.clone(), Duration::from_millis(50));
        connector.set_latency(Duration::from_millis(300));

        let dropped = registry.acquire_connection(&db("Slow")).await;
        assert!(matches!(dropped, Err(ConnectionError::Timeout { .. })));

        let key = db("Slow");
        let dropped = registry.acquire_connection(&key);
        assert!(tokio::time::timeout(Duration::from_millis(10), dropped).await.is_err());
        tokio::time::sleep(Duration::from_millis(100)).await;

        connector.set_latency(Duration::from_millis(20));
        let started = tokio::time::Instant::now();
        assert!(registry.acquire_connection(&db("Slow")).await.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(connector.connect_attempts(&db("Slow")), 3);
    }
}
