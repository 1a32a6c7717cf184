//! Transactional mail API configuration

use crate::backend::validate_url;
use crate::{get_env_or_default, ConfigResult};

/// Settings for the HTTP mail delivery API
#[derive(Clone)]
pub struct MailConfig {
    /// Base URL of the mail API
    pub api_url: String,

    /// API key (empty disables authentication, useful for local relays)
    pub api_key: String,

    /// Sender address for outgoing mail
    pub from_address: String,
}

impl MailConfig {
    /// Load mail configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let api_url = get_env_or_default("MAIL_API_URL", "http://localhost:8025/api");
        validate_url("MAIL_API_URL", &api_url)?;

        Ok(Self {
            api_url,
            api_key: get_env_or_default("MAIL_API_KEY", ""),
            from_address: get_env_or_default("MAIL_FROM", "no-reply@soundbank.local"),
        })
    }

    /// Create a configuration with a custom URL (useful for testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            api_url: url.into(),
            ..Self::default()
        }
    }

    /// URL of the send endpoint
    pub fn send_url(&self) -> String {
        format!("{}/emails", self.api_url.trim_end_matches('/'))
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8025/api".to_string(),
            api_key: String::new(),
            from_address: "no-reply@soundbank.local".to_string(),
        }
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("from_address", &self.from_address)
            .finish()
    }
}
