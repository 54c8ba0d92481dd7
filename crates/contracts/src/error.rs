//! Layered error definitions
//!
//! Categorized by source: config / transport / decode / store

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Configuration and startup errors
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Configuration validation error (malformed sensor definition)
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised across the transport seam
#[derive(Debug, Error)]
pub enum TransportError {
    /// Publish call failed; the caller keeps its cadence
    #[error("transport '{transport}' publish failed: {message}")]
    Publish { transport: String, message: String },

    /// The underlying stream is no longer accepting messages
    #[error("transport '{transport}' is closed")]
    Closed { transport: String },

    /// Releasing the handle failed during shutdown
    #[error("transport '{transport}' close failed: {message}")]
    Shutdown { transport: String, message: String },
}

impl TransportError {
    /// Create publish error
    pub fn publish(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Create closed error
    pub fn closed(transport: impl Into<String>) -> Self {
        Self::Closed {
            transport: transport.into(),
        }
    }

    /// Create shutdown error
    pub fn shutdown(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Shutdown {
            transport: transport.into(),
            message: message.into(),
        }
    }
}

/// Inbound payload could not be turned into a `Reading`
#[derive(Debug, Error)]
#[error("message decode failed: {message}")]
pub struct DecodeError {
    message: String,
    payload: String,
    #[source]
    source: Option<serde_json::Error>,
}

impl DecodeError {
    pub(crate) fn new(
        message: impl Into<String>,
        payload: &[u8],
        source: Option<serde_json::Error>,
    ) -> Self {
        Self {
            message: message.into(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            source,
        }
    }

    /// Raw payload as received (lossy UTF-8)
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Persistent store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached or opened
    #[error("store connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Insert/update/delete failed
    #[error("store write error: {message}")]
    Write {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Row violates a column constraint
    #[error("constraint violation on '{column}': {message}")]
    Constraint { column: String, message: String },

    /// Read query failed
    #[error("store query error: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Query parameters rejected before reaching the store
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// No row with the requested identifier
    #[error("reading {id} not found")]
    NotFound { id: i64 },
}

impl StoreError {
    /// Create connection error
    pub fn connection(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create write error
    pub fn write(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Write {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create query error
    pub fn query(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Query {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create constraint violation error
    pub fn constraint(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Constraint {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }
}
