//! Authentication REST route handlers for Soundbank
//!
//! Provides endpoints for user authentication:
//! - `POST /api/auth/login` - Sign in and receive the session cookie (LOGIN limit)
//! - `POST /api/auth/logout` - End the session and clear the cookie
//! - `POST /api/auth/reset-password` - Email a reset code (PASSWORD_RESET limit)
//! - `POST /api/auth/verify-reset-code` - Set a new password with a code (PASSWORD_RESET limit)
//! - `POST /api/auth/verify-session` - Check and refresh the session cookie (API limit)
//!
//! Input is validated before the rate limiter counts a request, and both
//! happen before any backend call.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::middleware::rate_limit::{ActionCategory, ClientIdentity, RateLimitDecision, RateLimitState};
use crate::middleware::session::{session_token, CookieSettings};
use crate::models::User;
use crate::routes::{message, success, ApiJson, MessageBody, Success};
use crate::services::auth::{validate_email, validate_new_password, validate_reset_code};
use crate::services::AuthService;

/// Shared application state for auth handlers
#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
    pub rate_limits: RateLimitState,
    pub cookies: CookieSettings,
}

impl AuthState {
    pub fn new(auth_service: AuthService, rate_limits: RateLimitState, cookies: CookieSettings) -> Self {
        Self {
            auth_service: Arc::new(auth_service),
            rate_limits,
            cookies,
        }
    }
}

/// Create authentication router
pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/reset-password", post(request_password_reset))
        .route("/verify-reset-code", post(verify_reset_code))
        .route("/verify-session", post(verify_session))
        .with_state(state)
}

// ========== Request/Response Types ==========

/// Login request body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password reset request body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub email: String,
}

/// Reset code verification body
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyResetCodeRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Response carrying the signed-in user
#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: User,
}

// ========== Route Handlers ==========

/// Sign in with email and password
///
/// # Response
/// - 200 OK: user payload, `sb-token` cookie set
/// - 400 Bad Request: malformed email or missing password
/// - 401 Unauthorized: credentials rejected
/// - 404 Not Found: the account has no user record
/// - 429 Too Many Requests: LOGIN limit spent
async fn login(
    State(state): State<AuthState>,
    ClientIdentity(client): ClientIdentity,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<(RateLimitDecision, CookieJar, Json<Success<UserBody>>)> {
    validate_email(&body.email)?;
    if body.password.is_empty() {
        return Err(ApiError::MissingField("password"));
    }

    let decision = state.rate_limits.enforce(ActionCategory::Login, &client).await?;

    let (user, session) = state
        .auth_service
        .login(&body.email, &body.password)
        .await?;

    let jar = jar.add(state.cookies.session_cookie(session.access_token));
    Ok((decision, jar, success(UserBody { user })))
}

/// End the session
///
/// Always succeeds: the cookie is cleared even when there was no session or
/// the auth service could not be reached.
async fn logout(
    State(state): State<AuthState>,
    jar: CookieJar,
) -> (CookieJar, Json<Success<MessageBody>>) {
    if let Some(token) = session_token(&jar) {
        state.auth_service.logout(&token).await;
    }
    (state.cookies.clear(jar), message("Logged out"))
}

/// Email a password reset code
///
/// An unknown email answers 404.
async fn request_password_reset(
    State(state): State<AuthState>,
    ClientIdentity(client): ClientIdentity,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> ApiResult<(RateLimitDecision, Json<Success<MessageBody>>)> {
    validate_email(&body.email)?;

    let decision = state
        .rate_limits
        .enforce(ActionCategory::PasswordReset, &client)
        .await?;

    state
        .auth_service
        .request_password_reset(&body.email)
        .await?;

    Ok((decision, message("Reset code sent")))
}

/// Set a new password using an emailed code
async fn verify_reset_code(
    State(state): State<AuthState>,
    ClientIdentity(client): ClientIdentity,
    ApiJson(body): ApiJson<VerifyResetCodeRequest>,
) -> ApiResult<(RateLimitDecision, Json<Success<MessageBody>>)> {
    validate_reset_code(&body.code)?;
    validate_email(&body.email)?;
    validate_new_password(&body.new_password)?;

    let decision = state
        .rate_limits
        .enforce(ActionCategory::PasswordReset, &client)
        .await?;

    state
        .auth_service
        .verify_reset_code(&body.email, &body.code, &body.new_password)
        .await?;

    Ok((decision, message("Password updated")))
}

/// Check the session cookie and refresh its lifetime
///
/// Any failure to resolve the session clears the cookie and answers 401.
async fn verify_session(
    State(state): State<AuthState>,
    ClientIdentity(client): ClientIdentity,
    jar: CookieJar,
) -> Response {
    let decision = match state.rate_limits.enforce(ActionCategory::Api, &client).await {
        Ok(decision) => decision,
        Err(e) => return e.into_response(),
    };

    let Some(token) = session_token(&jar) else {
        return (decision, state.cookies.clear(jar), ApiError::Unauthorized).into_response();
    };

    match state.auth_service.verify_session(&token).await {
        Ok(user) => {
            let jar = jar.add(state.cookies.session_cookie(token));
            (decision, jar, success(UserBody { user })).into_response()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Session verification failed, clearing cookie");
            (decision, state.cookies.clear(jar), ApiError::Unauthorized).into_response()
        }
    }
}
