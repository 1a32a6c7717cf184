//! Authentication extractors for Axum handlers
//!
//! The session middleware resolves the cookie once per request and leaves a
//! [`CurrentUser`] in the request extensions. These extractors read it:
//! - `MaybeAuthUser`: optional session, `None` if anonymous
//! - `AdminUser`: requires an admin session, returns 401 otherwise
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::middleware::{AdminUser, MaybeAuthUser};
//!
//! async fn admin_handler(admin: AdminUser) -> impl IntoResponse {
//!     format!("Admin access granted for {}", admin.user.email)
//! }
//!
//! async fn public_handler(auth: MaybeAuthUser) -> impl IntoResponse {
//!     match auth.user {
//!         Some(user) => format!("Hello, {}", user.email),
//!         None => "Hello, guest".to_string(),
//!     }
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::middleware::session::CurrentUser;
use crate::models::User;

/// Caller if signed in
#[derive(Debug, Clone)]
pub struct MaybeAuthUser {
    pub user: Option<User>,
    pub token: Option<String>,
}

/// Signed-in admin; rejects anonymous and non-admin callers alike
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user: User,
}

/// Authentication rejection types
///
/// Every variant answers 401 so that a non-admin cannot tell an admin route
/// from a missing session.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// No resolved session on the request
    MissingSession,
    /// Caller is signed in but not an admin
    InsufficientPermissions,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::MissingSession => {
                tracing::debug!("Authentication rejected: no session");
            }
            AuthRejection::InsufficientPermissions => {
                tracing::warn!("Authentication rejected: admin role required");
            }
        }
        ApiError::Unauthorized.into_response()
    }
}

impl From<AuthRejection> for ApiError {
    fn from(_: AuthRejection) -> Self {
        ApiError::Unauthorized
    }
}

impl MaybeAuthUser {
    /// The caller, if it is an admin
    pub fn require_admin(&self) -> Result<&User, AuthRejection> {
        let user = self.user.as_ref().ok_or(AuthRejection::MissingSession)?;
        if !user.is_admin() {
            return Err(AuthRejection::InsufficientPermissions);
        }
        Ok(user)
    }
}

fn current_user(parts: &Parts) -> Option<&CurrentUser> {
    parts.extensions.get::<CurrentUser>()
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current = current_user(parts);
        Ok(MaybeAuthUser {
            user: current.map(|c| c.user.clone()),
            token: current.map(|c| c.token.clone()),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current = current_user(parts).ok_or(AuthRejection::MissingSession)?;
        if !current.user.is_admin() {
            return Err(AuthRejection::InsufficientPermissions);
        }
        Ok(AdminUser {
            user: current.user.clone(),
        })
    }
}
