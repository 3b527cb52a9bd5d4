//! Configuration validation.
//!
//! Serde handles syntax; this module checks meaning. All issues are
//! collected rather than stopping at the first one.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{BackendKind, FieldKind, GatewayConfig, SchemaDefinition};
use crate::schema::SCHEMALESS;
use crate::store::mongo::{has_mongodb_scheme, DATABASE_PLACEHOLDER, PASSWORD_PLACEHOLDER};
use crate::store::{CollectionName, DatabaseName};

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the offending setting.
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration. An empty result means it is usable.
pub fn validate_config(config: &GatewayConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        issues.push(ConfigIssue::new("listener.max_connections", "must be greater than 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        issues.push(ConfigIssue::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    validate_database(config, &mut issues);
    validate_timeouts(config, &mut issues);
    validate_schemas(config, &mut issues);

    issues
}

fn validate_database(config: &GatewayConfig, issues: &mut Vec<ConfigIssue>) {
    let db = &config.database;

    if db.backend == BackendKind::Mongodb {
        if !has_mongodb_scheme(&db.uri_template) {
            issues.push(ConfigIssue::new(
                "database.uri_template",
                "must use the mongodb:// or mongodb+srv:// scheme",
            ));
        }
        if !db.uri_template.contains(DATABASE_PLACEHOLDER) {
            issues.push(ConfigIssue::new(
                "database.uri_template",
                format!("must contain {}", DATABASE_PLACEHOLDER),
            ));
        }
        if db.uri_template.contains(PASSWORD_PLACEHOLDER)
            && db.password.as_deref().map_or(true, str::is_empty)
        {
            issues.push(ConfigIssue::new(
                "database.password",
                format!("must be non-empty because uri_template contains {}", PASSWORD_PLACEHOLDER),
            ));
        }
    }

    if let Err(e) = DatabaseName::parse(&db.default_database) {
        issues.push(ConfigIssue::new("database.default_database", e.to_string()));
    }
    if let Err(e) = CollectionName::parse(&db.default_collection) {
        issues.push(ConfigIssue::new("database.default_collection", e.to_string()));
    }
}

fn validate_timeouts(config: &GatewayConfig, issues: &mut Vec<ConfigIssue>) {
    let t = &config.timeouts;
    for (name, value) in [
        ("timeouts.connect_secs", t.connect_secs),
        ("timeouts.request_secs", t.request_secs),
        ("timeouts.operation_secs", t.operation_secs),
        ("timeouts.max_operation_secs", t.max_operation_secs),
    ] {
        if value == 0 {
            issues.push(ConfigIssue::new(name, "must be greater than 0"));
        }
    }
    if t.max_operation_secs < t.operation_secs {
        issues.push(ConfigIssue::new(
            "timeouts.max_operation_secs",
            "must not be lower than operation_secs",
        ));
    }
    if config.startup.connect_attempts == 0 {
        issues.push(ConfigIssue::new("startup.connect_attempts", "must be at least 1"));
    }
}

fn validate_schemas(config: &GatewayConfig, issues: &mut Vec<ConfigIssue>) {
    let schemas = &config.schemas;
    let known = |name: &str| {
        name == SCHEMALESS
            || name == crate::schema::INVENTORY
            || schemas.definitions.contains_key(name)
    };

    if !known(&schemas.default_schema) {
        issues.push(ConfigIssue::new(
            "schemas.default_schema",
            format!("unknown schema '{}'", schemas.default_schema),
        ));
    }

    for (target, schema) in &schemas.bindings {
        if !known(schema) {
            issues.push(ConfigIssue::new(
                format!("schemas.bindings.{}", target),
                format!("unknown schema '{}'", schema),
            ));
        }
    }

    for (name, definition) in &schemas.definitions {
        if name == SCHEMALESS {
            issues.push(ConfigIssue::new(
                format!("schemas.definitions.{}", name),
                "name is reserved for schemaless collections",
            ));
        }
        validate_definition(name, definition, issues);
    }
}

fn validate_definition(name: &str, definition: &SchemaDefinition, issues: &mut Vec<ConfigIssue>) {
    let mut seen = HashSet::new();

    for field in &definition.fields {
        let path = format!("schemas.definitions.{}.{}", name, field.name);

        if field.name.is_empty() || field.name.starts_with('$') || field.name.contains('.') {
            issues.push(ConfigIssue::new(&path, "invalid field name"));
        }
        if field.name == crate::store::ID_FIELD {
            issues.push(ConfigIssue::new(&path, "the id field cannot be declared"));
        }
        if !seen.insert(field.name.as_str()) {
            issues.push(ConfigIssue::new(&path, "declared more than once"));
        }
        if !field.allowed.is_empty() && field.kind != FieldKind::String {
            issues.push(ConfigIssue::new(&path, "allowed values apply to string fields only"));
        }
        if field.min.is_some() && !matches!(field.kind, FieldKind::Number | FieldKind::Integer) {
            issues.push(ConfigIssue::new(&path, "min applies to numeric fields only"));
        }
    }
}
