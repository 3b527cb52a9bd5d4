//! Lazily populated, concurrency-safe registries.
//!
//! Two layers compose here:
//!
//! - [`ConnectionRegistry`] keeps one shared connection per database name.
//! - [`AccessorRegistry`] keeps one schema-bound [`Accessor`] per
//!   (database, collection), built on top of the connection registry.
//!
//! Both use [`single_flight::SingleFlight`], so concurrent first requests for
//! the same key do the expensive work exactly once, and failures are never
//! cached.

pub mod accessor;
pub mod accessors;
pub mod connections;
pub mod single_flight;

pub use accessor::Accessor;
pub use accessors::AccessorRegistry;
pub use connections::ConnectionRegistry;
