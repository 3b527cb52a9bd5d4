//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → update sent to the server, which swaps the schema catalog
//! ```
//!
//! Only the schema catalog is hot-reloadable. Listener, backend and timeout
//! changes are logged and take effect on restart.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{BackendKind, DatabaseConfig, GatewayConfig, ListenerConfig, SchemaConfig};
pub use validation::{validate_config, ConfigIssue};
