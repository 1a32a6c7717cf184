//! Session resolution
//!
//! Turns the token from the session cookie into a [`User`]. Resolution never
//! fails a request on its own: a missing, expired or unknown token resolves
//! to an anonymous caller. Only a fault on our side (backend
//! misconfiguration or a panic while resolving) is fatal.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use soundbank_backend_client::{Access, AuthProvider};

use crate::models::User;
use crate::repositories::UserRepository;

/// Outcome of resolving a session token
#[derive(Debug, Clone, PartialEq)]
pub enum SessionResolution {
    /// Token maps to a known user
    Resolved(User),
    /// No usable session; the request continues anonymously
    Unresolved(UnresolvedReason),
    /// Resolution itself broke; the request must be answered with a 500
    Fatal(String),
}

/// Why a request stays anonymous
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    NoToken,
    InvalidToken,
    NoUserRecord,
    LookupFailed,
}

impl UnresolvedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoToken => "no session token",
            Self::InvalidToken => "session token rejected",
            Self::NoUserRecord => "no user record for identity",
            Self::LookupFailed => "user lookup failed",
        }
    }
}

/// Resolves session tokens against the auth service and the `users` table
#[derive(Clone)]
pub struct SessionResolver {
    auth: Arc<dyn AuthProvider>,
    users: UserRepository,
}

impl SessionResolver {
    pub fn new(auth: Arc<dyn AuthProvider>, users: UserRepository) -> Self {
        Self { auth, users }
    }

    /// Resolve an optional token
    pub async fn resolve(&self, token: Option<&str>) -> SessionResolution {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return SessionResolution::Unresolved(UnresolvedReason::NoToken);
        };

        match AssertUnwindSafe(self.resolve_token(token)).catch_unwind().await {
            Ok(resolution) => resolution,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(panic = %message, "Session resolution panicked");
                SessionResolution::Fatal(message)
            }
        }
    }

    async fn resolve_token(&self, token: &str) -> SessionResolution {
        let identity = match self.auth.get_user(token).await {
            Ok(identity) => identity,
            Err(e) if e.is_configuration() => {
                tracing::error!(error = %e, "Session resolution misconfigured");
                return SessionResolution::Fatal(e.to_string());
            }
            Err(e) => {
                tracing::debug!(error = %e, "Session token not accepted");
                return SessionResolution::Unresolved(UnresolvedReason::InvalidToken);
            }
        };

        match self
            .users
            .find_by_id(identity.id, &Access::User(token.to_string()))
            .await
        {
            Ok(Some(user)) => SessionResolution::Resolved(user),
            Ok(None) => {
                tracing::warn!(user_id = %identity.id, "Session identity has no user record");
                SessionResolution::Unresolved(UnresolvedReason::NoUserRecord)
            }
            Err(e) if e.is_configuration() => {
                tracing::error!(error = %e, "Session resolution misconfigured");
                SessionResolution::Fatal(e.to_string())
            }
            Err(e) => {
                tracing::warn!(user_id = %identity.id, error = %e, "User lookup for session failed");
                SessionResolution::Unresolved(UnresolvedReason::LookupFailed)
            }
        }
    }
}
