//! Core HTTP client for the hosted backend with connection pooling

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use soundbank_shared_config::BackendConfig;
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::models::{Access, ErrorBody};

/// Maximum error body size to prevent memory exhaustion
const MAX_ERROR_BODY_SIZE: usize = 1000;

/// SQLSTATE returned by the REST API when row-level access rules deny a query
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Which API produced a response; decides how error statuses are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Surface {
    Auth,
    Rest,
    Storage,
}

/// Client for the hosted auth, REST database and object storage APIs
///
/// `BackendClient` is `Clone + Send + Sync`; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// HTTP client with connection pool
    pub(crate) http_client: Client,
    /// Configuration
    pub(crate) config: BackendConfig,
}

impl BackendClient {
    /// Create a new backend client from configuration
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(BackendError::HttpError)?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    /// Create a client with custom HTTP client (for testing)
    pub fn with_client(config: &BackendConfig, http_client: Client) -> Self {
        Self {
            http_client,
            config: config.clone(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Headers authenticating a call with the given credentials
    pub(crate) fn access_headers(&self, access: &Access) -> BackendResult<HeaderMap> {
        let (api_key, bearer) = match access {
            Access::User(token) => (self.config.anon_key.as_str(), token.as_str()),
            Access::Service => {
                let key = self.service_key()?;
                (key, key)
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);
        Ok(headers)
    }

    /// Headers for anonymous calls (sign-in, health)
    pub(crate) fn anon_headers(&self) -> BackendResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.config.anon_key)?);
        Ok(headers)
    }

    fn service_key(&self) -> BackendResult<&str> {
        self.config.service_role_key.as_deref().ok_or_else(|| {
            BackendError::Configuration("service-role key is not configured".to_string())
        })
    }

    /// Map transport failures, distinguishing an unreachable backend
    pub(crate) fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::ConnectionRefused(self.config.url.clone())
        } else {
            BackendError::HttpError(e)
        }
    }

    /// Pass successful responses through and translate error statuses
    pub(crate) async fn check(
        &self,
        response: Response,
        surface: Surface,
        resource: &str,
    ) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = Self::truncate_error_body(response.text().await.unwrap_or_default());
        let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        let message = body.message().map(str::to_string).unwrap_or(raw);

        debug!(
            status = status.as_u16(),
            surface = ?surface,
            resource = resource,
            "Backend call returned error status"
        );

        Err(classify(surface, status, body.code().as_deref(), resource, message))
    }

    /// Truncate error body to prevent memory exhaustion
    /// Safely handles UTF-8 boundaries to avoid panics on multi-byte characters
    pub(crate) fn truncate_error_body(body: String) -> String {
        if body.len() <= MAX_ERROR_BODY_SIZE {
            return body;
        }

        let truncate_at = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_ERROR_BODY_SIZE)
            .last()
            .unwrap_or(0);

        format!("{}... (truncated)", &body[..truncate_at])
    }
}

fn classify(
    surface: Surface,
    status: StatusCode,
    code: Option<&str>,
    resource: &str,
    message: String,
) -> BackendError {
    if code == Some(INSUFFICIENT_PRIVILEGE) {
        return BackendError::AccessDenied(resource.to_string());
    }

    match (surface, status) {
        (Surface::Auth, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            BackendError::Unauthorized
        }
        (Surface::Rest | Surface::Storage, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            BackendError::AccessDenied(resource.to_string())
        }
        (_, StatusCode::NOT_FOUND) => BackendError::NotFound(resource.to_string()),
        _ => BackendError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

fn header_value(value: &str) -> BackendResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| BackendError::Configuration("credential is not a valid header value".to_string()))
}
