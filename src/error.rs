//! Error kinds shared by the registries, accessors and HTTP layer.
//!
//! Every error that can be handed to more than one waiter of a single-flight
//! creation is `Clone`; driver errors are flattened to strings at the edge.

use thiserror::Error;
use tokio::task::JoinError;

/// Failure to open (or to even attempt opening) a named database connection.
///
/// Never cached: a later acquire for the same database retries from scratch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The URI template or credential cannot produce a usable URI.
    #[error("connection template unusable: {0}")]
    Template(String),

    /// The driver failed to connect or to verify the connection.
    #[error("failed to connect to database '{database}': {message}")]
    Connect { database: String, message: String },

    /// The connection attempt exceeded the connect deadline.
    #[error("connecting to database '{database}' timed out after {millis}ms")]
    Timeout { database: String, millis: u64 },

    /// The connect task panicked or was cancelled by runtime shutdown.
    #[error("connection attempt aborted: {0}")]
    Aborted(String),
}

impl From<JoinError> for ConnectionError {
    fn from(e: JoinError) -> Self {
        ConnectionError::Aborted(e.to_string())
    }
}

/// Failure to construct an accessor for a (database, collection) pair.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaBindError {
    /// The catalog binds the collection to a schema it does not define.
    #[error("collection '{collection}' is bound to unknown schema '{schema}'")]
    UnknownSchema { collection: String, schema: String },

    /// The backend refused to prepare the collection (e.g. index creation).
    #[error("failed to bind schema '{schema}' to '{collection}': {message}")]
    Backend {
        collection: String,
        schema: String,
        message: String,
    },
}

/// Malformed input detected before anything reaches storage.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("'{0}' is not a valid document id")]
    InvalidId(String),

    #[error("request body is malformed: {0}")]
    MalformedBody(String),

    #[error("query string is malformed: {0}")]
    InvalidQuery(String),

    #[error("request body must contain {0}")]
    MissingBody(&'static str),

    #[error("a document must be a JSON object")]
    NotAnObject,

    #[error("at least one document is required")]
    EmptyBatch,

    #[error("field '{0}' is required")]
    MissingField(String),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field '{field}' does not allow value '{value}'")]
    NotAllowed { field: String, value: String },

    #[error("field '{field}' must be at least {min}")]
    BelowMinimum { field: String, min: f64 },

    #[error("field '{0}' is not part of the schema")]
    UnknownField(String),

    #[error("field '{0}' is reserved")]
    ReservedField(String),

    #[error("'{0}' is not a valid field name")]
    InvalidFieldName(String),

    #[error("document {index}: {reason}")]
    InDocument {
        index: usize,
        reason: Box<ValidationError>,
    },
}

/// Errors surfaced on the request path.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    SchemaBind(#[from] SchemaBindError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("document '{id}' not found in {collection}")]
    NotFound { collection: String, id: String },

    #[error("operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("{0}")]
    Unknown(String),
}

impl From<JoinError> for GatewayError {
    fn from(e: JoinError) -> Self {
        GatewayError::Unknown(format!("accessor creation aborted: {}", e))
    }
}

/// Result type for request-path operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
