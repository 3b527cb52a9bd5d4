//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registries, accessors and handlers produce:
//!     → logging.rs (structured log events, request span carries x-request-id)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
