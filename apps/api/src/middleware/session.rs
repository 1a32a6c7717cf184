//! Session cookie resolution
//!
//! [`resolve_session`] runs on every request before routing. It reads the
//! `sb-token` cookie, resolves it through [`SessionResolver`] and, when a user
//! is found, stores a [`CurrentUser`] in the request extensions for the auth
//! extractors. Requests without a usable session continue anonymously; only a
//! fatal resolution fault stops the request with a plain-text 500.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::models::User;
use crate::services::{SessionResolution, SessionResolver};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "sb-token";

/// Default session lifetime: one week
pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 3600;

/// Resolved caller, stored in request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Session token the user was resolved from
    pub token: String,
}

/// Attributes of the session cookie
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub max_age_secs: i64,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            secure: true,
        }
    }
}

impl CookieSettings {
    /// Session cookie carrying `token`
    pub fn session_cookie(&self, token: impl Into<String>) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.into()))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(self.max_age_secs))
            .build()
    }

    /// Cookie jar with the session cookie removed
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}

/// Session token from the request cookies, if any
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Middleware resolving the session cookie into a [`CurrentUser`]
pub async fn resolve_session(
    State(resolver): State<SessionResolver>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(&jar);

    match resolver.resolve(token.as_deref()).await {
        SessionResolution::Resolved(user) => {
            tracing::debug!(user_id = %user.id, role = ?user.role, "Session resolved");
            if let Some(token) = token {
                request.extensions_mut().insert(CurrentUser { user, token });
            }
        }
        SessionResolution::Unresolved(reason) => {
            tracing::debug!(reason = reason.as_str(), "Continuing without session");
        }
        SessionResolution::Fatal(error) => {
            tracing::error!(error = %error, path = %request.uri().path(), "Session middleware failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    }

    next.run(request).await
}
