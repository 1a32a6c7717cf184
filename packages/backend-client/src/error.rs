//! Error types for the backend client

use thiserror::Error;

/// Errors that can occur when talking to the hosted backend or mail API
#[derive(Error, Debug)]
pub enum BackendError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The backend answered with an unexpected error status
    #[error("backend API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Email/password pair rejected at sign-in
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Session token rejected (expired, revoked or malformed)
    #[error("session token rejected")]
    Unauthorized,

    /// Row-level access rules denied the read or write; the row may still exist
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Response body did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Connection refused (backend not reachable)
    #[error("connection refused. Is the backend running at {0}?")]
    ConnectionRefused(String),

    /// Client is missing something it needs, such as the service-role key
    #[error("backend client misconfigured: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Whether this error is a row-level access denial
    pub fn is_access_denied(&self) -> bool {
        matches!(self, BackendError::AccessDenied(_))
    }

    /// Whether this error points at local misconfiguration rather than the remote side
    pub fn is_configuration(&self) -> bool {
        matches!(self, BackendError::Configuration(_))
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
