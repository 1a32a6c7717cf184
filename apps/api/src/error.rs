//! Error handling for the Soundbank API
//!
//! One error type for every handler, mapped to an HTTP status and a stable
//! error code through Axum's IntoResponse trait. Server-side failures are
//! logged with their full cause and answered with a generic message.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use soundbank_backend_client::BackendError;
use thiserror::Error;

use crate::middleware::rate_limit::{
    RETRY_AFTER, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};

/// Message returned for every failure the caller cannot act on
const GENERIC_FAILURE: &str = "An unexpected error occurred";

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Human-readable error message
    pub error: String,
    /// Error code for client-side handling
    pub code: &'static str,
}

/// Main API error type
#[derive(Error, Debug)]
pub enum ApiError {
    // ========== Authentication ==========
    /// Missing, invalid or insufficiently privileged session
    #[error("authentication required")]
    Unauthorized,

    /// Email/password pair rejected by the auth service
    #[error("invalid credentials")]
    InvalidCredentials,

    // ========== Resource Errors ==========
    /// Requested resource not found
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    // ========== Validation Errors ==========
    /// Request validation failed
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    // ========== Rate Limiting ==========
    /// Fixed-window limit exhausted for this client and action
    #[error("rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited {
        limit: u32,
        /// Unix timestamp (seconds) at which the window resets
        reset_at: u64,
        retry_after: u64,
    },

    // ========== External Service Errors ==========
    /// A backend call failed; `context` is what the caller is told
    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: BackendError,
    },

    // ========== Internal Errors ==========
    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. } | Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for client-side handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Message safe to show the caller
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized => "Authentication required".to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::NotFound { resource_type, .. } => format!("{} not found", resource_type),
            Self::ValidationError(msg) => msg.clone(),
            Self::MissingField(field) => format!("Missing required field: {}", field),
            Self::RateLimited { retry_after, .. } => {
                format!("Too many requests, retry after {} seconds", retry_after)
            }
            Self::Upstream { context, .. } => context.clone(),
            Self::Configuration(_) => GENERIC_FAILURE.to_string(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// Wrap a backend failure with the message the caller should see
    ///
    /// ```rust,ignore
    /// storage.remove(bucket, &paths).await.map_err(ApiError::upstream("Failed to delete files"))?;
    /// ```
    pub fn upstream(context: &'static str) -> impl Fn(BackendError) -> ApiError {
        move |source| ApiError::Upstream {
            context: context.to_string(),
            source,
        }
    }

    /// Log the error with appropriate severity based on status code
    pub fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Authorization error"
            );
        } else {
            tracing::debug!(
                error = %self,
                code = self.error_code(),
                status = status.as_u16(),
                "Client error"
            );
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = Json(ErrorResponse {
            success: false,
            error: self.public_message(),
            code: self.error_code(),
        });

        if let Self::RateLimited {
            limit,
            reset_at,
            retry_after,
        } = self
        {
            let headers: [(HeaderName, HeaderValue); 4] = [
                (X_RATELIMIT_LIMIT, HeaderValue::from(limit)),
                (X_RATELIMIT_REMAINING, HeaderValue::from(0u32)),
                (X_RATELIMIT_RESET, HeaderValue::from(reset_at)),
                (RETRY_AFTER, HeaderValue::from(retry_after)),
            ];
            return (status, headers, body).into_response();
        }

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

// ========== Conversion Implementations ==========

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidCredentials => Self::InvalidCredentials,
            BackendError::Unauthorized | BackendError::AccessDenied(_) => Self::Unauthorized,
            BackendError::Configuration(msg) => Self::Configuration(msg),
            source => Self::Upstream {
                context: "Upstream service request failed".to_string(),
                source,
            },
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::ValidationError(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        Self::ValidationError(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        Self::ValidationError(format!("Invalid JSON body: {}", err.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        Self::ValidationError(format!("Invalid query string: {}", err.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        Self::ValidationError(format!("Invalid path: {}", err.body_text()))
    }
}
