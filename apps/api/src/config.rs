//! API server configuration

use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use soundbank_shared_config::{
    BackendConfig, CommonConfig, Environment, MailConfig, DEFAULT_STORAGE_BUCKET,
};

use crate::middleware::rate_limit::{ActionCategory, RateLimitPolicies, RateLimitPolicy};
use crate::middleware::session::{CookieSettings, DEFAULT_SESSION_MAX_AGE_SECS};
use crate::services::auth::{parse_duration_string, AuthConfig};
use crate::services::sounds::DEFAULT_MAX_UPLOAD_BYTES;

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,

    /// Server port (default: 8080)
    pub port: u16,

    /// CORS allowed origins (optional)
    pub cors_allowed_origins: Option<Vec<String>>,

    /// Session cookie lifetime in seconds (default: 7d)
    pub session_max_age_secs: i64,

    /// Set the `Secure` attribute on the session cookie (default: true)
    pub cookie_secure: bool,

    /// Lifetime of password reset codes in seconds (default: 15m)
    pub reset_code_ttl_secs: i64,

    /// Require an admin session for uploads (default: true)
    pub upload_require_admin: bool,

    /// Maximum upload size in bytes (default: 5 MiB)
    pub upload_max_bytes: usize,

    /// Address that receives contact form messages
    pub contact_recipient: String,

    /// Rate-limit policy per action category
    pub rate_limits: RateLimitPolicies,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// In production mode, this function requires:
    /// - `BACKEND_SERVICE_ROLE_KEY`: privileged lookups, storage and password updates
    /// - `MAIL_API_KEY`: reset codes and contact messages
    /// - `CONTACT_RECIPIENT`: must be explicitly set
    ///
    /// In development/staging mode, sensible defaults are used for convenience.
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        )
        .unwrap_or_default();
        let is_production = environment.is_production();

        let common = CommonConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if is_production {
            Self::validate_backend(&common.backend)?;
            Self::validate_mail(&common.mail)?;
        }

        let session_max_age = env::var("SESSION_MAX_AGE").unwrap_or_else(|_| "7d".to_string());
        let session_max_age_secs = parse_duration_string(&session_max_age)
            .filter(|secs| *secs > 0)
            .with_context(|| format!("Invalid SESSION_MAX_AGE value '{}'", session_max_age))?;

        let reset_code_expiry =
            env::var("RESET_CODE_EXPIRY").unwrap_or_else(|_| "15m".to_string());
        let reset_code_ttl_secs = parse_duration_string(&reset_code_expiry)
            .filter(|secs| *secs > 0)
            .with_context(|| format!("Invalid RESET_CODE_EXPIRY value '{}'", reset_code_expiry))?;

        Ok(Self {
            common,

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT value")?,

            cors_allowed_origins: env::var("CORS_ORIGINS").ok().map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),

            session_max_age_secs,

            cookie_secure: parse_bool("COOKIE_SECURE", true)?,

            reset_code_ttl_secs,

            upload_require_admin: parse_bool("UPLOAD_REQUIRE_ADMIN", true)?,

            upload_max_bytes: env::var("UPLOAD_MAX_BYTES")
                .ok()
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("Invalid UPLOAD_MAX_BYTES value")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),

            contact_recipient: Self::load_contact_recipient(is_production)?,

            rate_limits: Self::load_rate_limits()?,
        })
    }

    /// The service-role key must be explicitly set in production
    fn validate_backend(backend: &BackendConfig) -> Result<()> {
        if !backend.has_service_role() {
            bail!(
                "BACKEND_SERVICE_ROLE_KEY environment variable is required in production. \
                 Please set the service-role key of your backend project."
            );
        }
        Ok(())
    }

    /// The mail API key must be explicitly set in production
    fn validate_mail(mail: &MailConfig) -> Result<()> {
        if mail.api_key.is_empty() {
            bail!(
                "MAIL_API_KEY environment variable is required in production. \
                 Please set the API key of your mail provider."
            );
        }
        Ok(())
    }

    fn load_contact_recipient(is_production: bool) -> Result<String> {
        match env::var("CONTACT_RECIPIENT") {
            Ok(address) if !address.trim().is_empty() => Ok(address.trim().to_string()),
            _ if is_production => {
                bail!("CONTACT_RECIPIENT environment variable is required in production.");
            }
            _ => {
                tracing::warn!(
                    "CONTACT_RECIPIENT not set, contact messages go to a local placeholder address."
                );
                Ok("contact@soundbank.local".to_string())
            }
        }
    }

    /// Apply `RATE_LIMIT_<CATEGORY>=<limit>/<duration>` overrides to the defaults
    fn load_rate_limits() -> Result<RateLimitPolicies> {
        let mut policies = RateLimitPolicies::default();
        for category in ActionCategory::ALL {
            let var = format!("RATE_LIMIT_{}", category.as_str());
            if let Ok(value) = env::var(&var) {
                let policy = RateLimitPolicy::from_str(&value)
                    .map_err(|e| anyhow::anyhow!("Invalid {} value: {}", var, e))?;
                policies.set(category, policy);
            }
        }
        Ok(policies)
    }

    /// Get backend configuration
    pub fn backend(&self) -> &BackendConfig {
        &self.common.backend
    }

    /// Get mail configuration
    pub fn mail(&self) -> &MailConfig {
        &self.common.mail
    }

    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }

    /// Settings consumed by the router
    pub fn app_settings(&self) -> AppSettings {
        AppSettings {
            cookies: CookieSettings {
                max_age_secs: self.session_max_age_secs,
                secure: self.cookie_secure,
            },
            auth: AuthConfig::with_reset_code_ttl(self.reset_code_ttl_secs),
            storage_bucket: self.common.backend.storage_bucket.clone(),
            upload_require_admin: self.upload_require_admin,
            upload_max_bytes: self.upload_max_bytes,
            contact_recipient: self.contact_recipient.clone(),
        }
    }
}

/// Runtime settings for route handlers, independent of the environment
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub cookies: CookieSettings,
    pub auth: AuthConfig,
    pub storage_bucket: String,
    pub upload_require_admin: bool,
    pub upload_max_bytes: usize,
    pub contact_recipient: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            cookies: CookieSettings {
                max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
                secure: true,
            },
            auth: AuthConfig::new(),
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            upload_require_admin: true,
            upload_max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            contact_recipient: "contact@soundbank.local".to_string(),
        }
    }
}

/// Parse a boolean flag (`true/false`, `1/0`, `yes/no`)
fn parse_bool(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => bail!("Invalid {} value '{}': expected true or false", name, other),
        },
        Err(_) => Ok(default),
    }
}
