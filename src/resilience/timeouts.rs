//! Deadline enforcement for request-path operations.
//!
//! Every CRUD operation runs under a deadline. Callers may ask for a shorter
//! (or longer) one with `timeout_ms`, capped by `max_operation_secs`.
//! Timed-out requests map to 504 Gateway Timeout.

use std::future::Future;
use std::time::Duration;

use crate::config::schema::TimeoutConfig;
use crate::error::{GatewayError, GatewayResult};

/// Effective deadline for one operation.
pub fn operation_deadline(requested_ms: Option<u64>, config: &TimeoutConfig) -> Duration {
    let max = Duration::from_secs(config.max_operation_secs);
    match requested_ms {
        Some(ms) => Duration::from_millis(ms.max(1)).min(max),
        None => Duration::from_secs(config.operation_secs).min(max),
    }
}

/// Run `fut` under `deadline`.
///
/// Expiry abandons the caller's wait only. A registry creation the caller
/// joined keeps running for other waiters and is neither cached as failed
/// nor cancelled.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout {
            millis: deadline.as_millis() as u64,
        }),
    }
}
