//! Hosted backend (auth, REST database, object storage) configuration

use crate::{get_env_or_default, parse_env, ConfigError, ConfigResult};

/// Default storage bucket holding uploaded sounds
pub const DEFAULT_STORAGE_BUCKET: &str = "sounds";

/// Connection settings for the hosted auth/database/storage provider
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL (e.g., https://xyzcompany.example.co)
    pub url: String,

    /// Public (anonymous) API key, sent with every request
    pub anon_key: String,

    /// Service-role key for privileged operations; bypasses row-level access rules
    pub service_role_key: Option<String>,

    /// Bucket that stores sound files
    pub storage_bucket: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Load backend configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let url = get_env_or_default("BACKEND_URL", "http://localhost:54321");
        validate_url("BACKEND_URL", &url)?;

        Ok(Self {
            url,
            anon_key: get_env_or_default("BACKEND_ANON_KEY", ""),
            service_role_key: std::env::var("BACKEND_SERVICE_ROLE_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            storage_bucket: get_env_or_default("STORAGE_BUCKET", DEFAULT_STORAGE_BUCKET),
            timeout_secs: parse_env("BACKEND_TIMEOUT_SECS", 10)?,
        })
    }

    /// Create a configuration with a custom URL (useful for testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Builder-style setter for the service-role key
    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// URL of the auth API
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base_url())
    }

    /// URL of the REST (table) API
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url())
    }

    /// URL of the object storage API
    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.base_url())
    }

    /// Whether privileged operations are possible
    pub fn has_service_role(&self) -> bool {
        self.service_role_key.is_some()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            service_role_key: None,
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            timeout_secs: 10,
        }
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "<redacted>"),
            )
            .field("storage_bucket", &self.storage_bucket)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

pub(crate) fn validate_url(name: &str, value: &str) -> ConfigResult<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.url, "http://localhost:54321");
        assert_eq!(config.storage_bucket, "sounds");
        assert!(!config.has_service_role());
    }

    #[test]
    fn test_endpoint_urls_with_trailing_slash() {
        let config = BackendConfig::with_url("https://project.example.co/");
        assert_eq!(config.auth_url(), "https://project.example.co/auth/v1");
        assert_eq!(config.rest_url(), "https://project.example.co/rest/v1");
        assert_eq!(config.storage_url(), "https://project.example.co/storage/v1");
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = BackendConfig::default().with_service_role_key("super-secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_validate_url_rejects_garbage() {
        assert!(validate_url("BACKEND_URL", "not a url").is_err());
        assert!(validate_url("BACKEND_URL", "https://ok.example.com").is_ok());
    }
}
