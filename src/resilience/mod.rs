//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request path:
//!     → timeouts.rs (per-operation deadline, caller-adjustable)
//!
//! Startup:
//!     → backoff.rs (delay between probe attempts)
//! ```

pub mod backoff;
pub mod timeouts;

pub use backoff::Backoff;
pub use timeouts::{operation_deadline, with_deadline};
