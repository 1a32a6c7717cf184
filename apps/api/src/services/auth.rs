//! Authentication service for Soundbank
//!
//! Passwords and sessions live in the hosted auth service; this module
//! drives it:
//! - Login with email/password and lookup of the extended user record
//! - Best-effort logout
//! - Password reset with emailed one-time codes
//! - Session verification for the `verify-session` route

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use soundbank_backend_client::{Access, AuthProvider, AuthSession, Email, Mailer};

use crate::error::{ApiError, ApiResult};
use crate::models::{NewPasswordResetCode, User};
use crate::repositories::{ResetCodeRepository, UserRepository};

/// Message returned for every failed reset-code verification
const INVALID_RESET_CODE: &str = "Invalid or expired reset code";

/// Authentication service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lifetime of an emailed reset code in seconds (default: 15 minutes)
    pub reset_code_ttl_secs: i64,
    /// Subject line of the reset email
    pub reset_email_subject: String,
}

impl AuthConfig {
    /// Create a new AuthConfig with default TTLs
    pub fn new() -> Self {
        Self {
            reset_code_ttl_secs: 15 * 60,
            reset_email_subject: "Your Soundbank password reset code".to_string(),
        }
    }

    /// Create AuthConfig with a reset-code lifetime already validated by the caller
    pub fn with_reset_code_ttl(ttl_secs: i64) -> Self {
        Self {
            reset_code_ttl_secs: ttl_secs,
            ..Self::new()
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse duration strings like "15m", "7d", "24h" to seconds
pub fn parse_duration_string(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (split, unit) = s.char_indices().last()?;
    let num: i64 = s[..split].parse().ok()?;

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 24 * 3600,
        'w' => 7 * 24 * 3600,
        _ => return None,
    };
    num.checked_mul(multiplier)
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthProvider>,
    users: UserRepository,
    reset_codes: ResetCodeRepository,
    mailer: Arc<dyn Mailer>,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        users: UserRepository,
        reset_codes: ResetCodeRepository,
        mailer: Arc<dyn Mailer>,
        config: AuthConfig,
    ) -> Self {
        Self {
            auth,
            users,
            reset_codes,
            mailer,
            config,
        }
    }

    /// Authenticate a user and open a session
    ///
    /// The caller validates the email shape first.
    ///
    /// # Errors
    /// - `ApiError::InvalidCredentials` if the auth service rejects the pair
    /// - `ApiError::NotFound` if the identity has no `users` row
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, AuthSession)> {
        let email = email.trim().to_lowercase();

        let session = self
            .auth
            .sign_in_with_password(&email, password)
            .await
            .map_err(|e| {
                tracing::warn!(email = %email, error = %e, "Login failed");
                ApiError::from(e)
            })?;

        let user = self
            .users
            .find_by_id(session.user.id, &Access::User(session.access_token.clone()))
            .await
            .map_err(ApiError::upstream("Failed to load user profile"))?
            .ok_or_else(|| {
                tracing::warn!(user_id = %session.user.id, "Login failed: no user record");
                ApiError::not_found("user", session.user.id.to_string())
            })?;

        tracing::info!(user_id = %user.id, email = %user.email, "User logged in successfully");

        Ok((user, session))
    }

    /// End a session with the auth service
    ///
    /// Best effort: a failure is logged and otherwise ignored so that logout
    /// always succeeds for the caller.
    pub async fn logout(&self, access_token: &str) {
        match self.auth.sign_out(access_token).await {
            Ok(()) => tracing::info!("Session logged out"),
            Err(e) => tracing::warn!(error = %e, "Sign-out with auth service failed"),
        }
    }

    /// Email a one-time reset code to a registered user
    ///
    /// # Errors
    /// - `ApiError::NotFound` if no user has this email
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<()> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(ApiError::upstream("Failed to look up user"))?
            .ok_or_else(|| ApiError::not_found("user", email.to_string()))?;

        let code = generate_reset_code();
        let expires_at = Utc::now() + Duration::seconds(self.config.reset_code_ttl_secs);

        self.reset_codes
            .create(&NewPasswordResetCode {
                user_id: user.id,
                code_hash: hash_code(&code),
                expires_at,
                used: false,
            })
            .await
            .map_err(ApiError::upstream("Failed to create reset code"))?;

        let minutes = self.config.reset_code_ttl_secs / 60;
        let body = format!(
            "Your password reset code is {}.\n\nIt expires in {} minutes. If you did not ask for a reset, ignore this email.",
            code, minutes
        );
        self.mailer
            .send(&Email::new(
                user.email.clone(),
                self.config.reset_email_subject.clone(),
                body,
            ))
            .await
            .map_err(ApiError::upstream("Failed to send reset email"))?;

        tracing::info!(user_id = %user.id, "Password reset code issued");

        Ok(())
    }

    /// Consume a reset code and set a new password
    ///
    /// The caller validates the email, code and password shapes first. A
    /// missing user and a missing, expired or used code are indistinguishable
    /// to the caller.
    pub async fn verify_reset_code(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(ApiError::upstream("Failed to look up user"))?
            .ok_or_else(|| {
                tracing::debug!("Reset code verification for unknown email");
                ApiError::ValidationError(INVALID_RESET_CODE.to_string())
            })?;

        let reset_code = self
            .reset_codes
            .find_active(user.id, &hash_code(code), Utc::now())
            .await
            .map_err(ApiError::upstream("Failed to verify reset code"))?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user.id, "Reset code rejected");
                ApiError::ValidationError(INVALID_RESET_CODE.to_string())
            })?;

        // Claim the code before changing the password so it works only once
        let claimed = self
            .reset_codes
            .mark_used(reset_code.id)
            .await
            .map_err(ApiError::upstream("Failed to verify reset code"))?;
        if !claimed {
            tracing::warn!(user_id = %user.id, "Reset code already consumed");
            return Err(ApiError::ValidationError(INVALID_RESET_CODE.to_string()));
        }

        self.auth
            .update_password(user.id, new_password)
            .await
            .map_err(ApiError::upstream("Failed to update password"))?;

        tracing::info!(user_id = %user.id, "Password reset completed");

        Ok(())
    }

    /// Resolve a session token to its user
    ///
    /// The users row is read with the caller's token; only a row-level
    /// access denial falls back to the service role. A row that is simply
    /// absent is not retried.
    pub async fn verify_session(&self, access_token: &str) -> ApiResult<User> {
        let identity = self.auth.get_user(access_token).await.map_err(|e| {
            tracing::debug!(error = %e, "Session token verification failed");
            ApiError::Unauthorized
        })?;

        let primary = self
            .users
            .find_by_id(identity.id, &Access::User(access_token.to_string()))
            .await;

        let user = match primary {
            Ok(user) => user,
            Err(e) if e.is_access_denied() => {
                tracing::debug!(user_id = %identity.id, "User lookup denied, retrying with service role");
                self.users
                    .find_by_id(identity.id, &Access::Service)
                    .await
                    .map_err(ApiError::upstream("Failed to load user profile"))?
            }
            Err(e) => return Err(ApiError::upstream("Failed to load user profile")(e)),
        };

        user.ok_or_else(|| {
            tracing::debug!(user_id = %identity.id, "Session identity has no user record");
            ApiError::Unauthorized
        })
    }
}

/// Random six-digit code, zero-padded
fn generate_reset_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// SHA-256 hex digest of a reset code
fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Simple email validation
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 {
        return false;
    }

    // Must have exactly one @ symbol
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() || local.len() > 64 {
        return false;
    }

    // Domain must have at least one dot and not be empty
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }

    domain.split('.').all(|part| !part.is_empty())
}

// ========== Request validation ==========

pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.trim().is_empty() {
        return Err(ApiError::MissingField("email"));
    }
    if !is_valid_email(email) {
        return Err(ApiError::ValidationError("invalid email format".to_string()));
    }
    Ok(())
}

/// Reset codes are exactly six ASCII digits
pub fn validate_reset_code(code: &str) -> ApiResult<()> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::ValidationError(
            "reset code must be exactly 6 digits".to_string(),
        ))
    }
}

pub fn validate_new_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < 8 {
        return Err(ApiError::ValidationError(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}
