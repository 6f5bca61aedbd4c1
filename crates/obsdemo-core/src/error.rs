//! Shared error type across obsdemo crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed config.
    BadRequest,
    /// Route does not exist.
    NotFound,
    /// Metric name already taken in a registry.
    AlreadyRegistered,
    /// Metric or label name rejected by the exposition grammar.
    InvalidName,
    /// Label values do not fit the declared label names.
    InvalidLabels,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::AlreadyRegistered => "ALREADY_REGISTERED",
            ClientCode::InvalidName => "INVALID_NAME",
            ClientCode::InvalidLabels => "INVALID_LABELS",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ObsDemoError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum ObsDemoError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("metric already registered: {0}")]
    AlreadyRegistered(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("metric {metric} declares {declared} labels, got {given} values")]
    InvalidLabels {
        metric: String,
        declared: usize,
        given: usize,
    },
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl ObsDemoError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            ObsDemoError::BadRequest(_) => ClientCode::BadRequest,
            ObsDemoError::NotFound(_) => ClientCode::NotFound,
            ObsDemoError::AlreadyRegistered(_) => ClientCode::AlreadyRegistered,
            ObsDemoError::InvalidName(_) => ClientCode::InvalidName,
            ObsDemoError::InvalidLabels { .. } => ClientCode::InvalidLabels,
            ObsDemoError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            ObsDemoError::Internal(_) => ClientCode::Internal,
        }
    }
}
