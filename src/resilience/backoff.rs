//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

use crate::config::schema::StartupConfig;

/// Capped exponential backoff policy.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    pub fn from_config(config: &StartupConfig) -> Self {
        Self::new(config.base_delay_ms, config.max_delay_ms)
    }

    /// Delay before retry number `attempt` (1-based). Attempt 0 waits nothing.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential = 2u64.saturating_pow(attempt - 1);
        let capped = self.base_ms.saturating_mul(exponential).min(self.max_ms);

        // Up to 10% jitter
        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}
