//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Database backend and connection template.
    pub database: DatabaseConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Startup probe settings.
    pub startup: StartupConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Document schema catalog.
    pub schemas: SchemaConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrently handled requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Mongodb,
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(BackendKind::Mongodb),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Which storage backend to use.
    pub backend: BackendKind,

    /// Connection URI template with `<PASSWORD>` and `<DATABASE>` placeholders.
    pub uri_template: String,

    /// Credential substituted for `<PASSWORD>`. Never logged.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Database probed at startup.
    pub default_database: String,

    /// Collection probed at startup.
    pub default_collection: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Mongodb,
            uri_template: "mongodb://localhost:27017/<DATABASE>".to_string(),
            password: None,
            default_database: "Test".to_string(),
            default_collection: "Items".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Default deadline for one CRUD operation in seconds.
    pub operation_secs: u64,

    /// Upper bound for a caller-supplied `timeout_ms`, in seconds.
    pub max_operation_secs: u64,

    /// Time allowed for in-flight requests to drain on shutdown.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            operation_secs: 10,
            max_operation_secs: 25,
            shutdown_secs: 10,
        }
    }
}

/// Startup probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Attempts to reach the default database before giving up.
    pub connect_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 2000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount `/admin/*` routes.
    pub enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Document schema catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    /// Schema for collections without a binding. `none` disables validation.
    pub default_schema: String,

    /// `"database.collection"` or `"collection"` → schema name.
    pub bindings: BTreeMap<String, String>,

    /// Named schema definitions. The built-in `inventory` is always present.
    pub definitions: BTreeMap<String, SchemaDefinition>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            default_schema: "inventory".to_string(),
            bindings: BTreeMap::new(),
            definitions: BTreeMap::new(),
        }
    }
}

/// What happens to document fields the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    #[default]
    Strip,
    Reject,
    Allow,
}

/// A named document shape.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub unknown_fields: UnknownFields,

    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// JSON type a field must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Any,
}

/// One declared field of a schema.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldDefinition {
    pub name: String,

    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    /// Allowed values for string fields (empty = unrestricted).
    #[serde(default)]
    pub allowed: Vec<String>,

    /// Inclusive lower bound for numeric fields.
    #[serde(default)]
    pub min: Option<f64>,

    /// Create a backend index for this field when binding.
    #[serde(default)]
    pub index: bool,
}
