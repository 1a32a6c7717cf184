//! HTTP route handlers for the Soundbank API
//!
//! This module contains all REST endpoint handlers:
//! - Authentication and password reset
//! - Sound library (list, upload, delete) and sound profiles
//! - Survey sign-ups and the contact form
//! - Health check and status endpoints
//!
//! [`api_router`] assembles them behind the session middleware.

pub mod auth;
pub mod contact;
pub mod health;
pub mod sound_profiles;
pub mod sounds;
pub mod survey;
pub mod upload;

pub use auth::{auth_router, AuthState};
pub use contact::{contact_router, ContactState};
pub use health::{health_router, HealthState};
pub use sound_profiles::sound_profiles_router;
pub use sounds::{sounds_router, SoundsState};
pub use survey::{survey_router, SurveyState};
pub use upload::{upload_router, UploadState};

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    middleware, Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use soundbank_backend_client::{AuthProvider, Database, Mailer, ObjectStorage};
use uuid::Uuid;

use crate::config::AppSettings;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{resolve_session, RateLimitState};
use crate::repositories::{
    ResetCodeRepository, SoundProfileRepository, SoundRepository, SurveyRepository, UserRepository,
};
use crate::services::{
    AuthService, ContactService, HealthService, SessionResolver, SoundService, SurveyService,
};

/// Backend handles and settings the router is built from
#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<dyn AuthProvider>,
    pub database: Arc<dyn Database>,
    pub storage: Arc<dyn ObjectStorage>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limits: RateLimitState,
    pub settings: AppSettings,
}

/// Build the full API router
///
/// Every request passes the session middleware first; routes then apply
/// their own rate limits and authorization.
pub fn api_router(ctx: AppContext) -> Router {
    let users = UserRepository::new(ctx.database.clone());
    let sounds = SoundRepository::new(ctx.database.clone());
    let profiles = SoundProfileRepository::new(ctx.database.clone());

    let auth_service = AuthService::new(
        ctx.auth.clone(),
        users.clone(),
        ResetCodeRepository::new(ctx.database.clone()),
        ctx.mailer.clone(),
        ctx.settings.auth.clone(),
    );
    let sound_service = SoundService::new(
        sounds,
        profiles,
        ctx.storage.clone(),
        ctx.settings.storage_bucket.clone(),
        ctx.settings.upload_max_bytes,
    );
    let survey_service = SurveyService::new(SurveyRepository::new(ctx.database.clone()));
    let contact_service =
        ContactService::new(ctx.mailer.clone(), ctx.settings.contact_recipient.clone());
    let resolver = SessionResolver::new(ctx.auth.clone(), users);

    let sounds_state = SoundsState::new(sound_service.clone(), ctx.rate_limits.clone());

    Router::new()
        .nest(
            "/api/auth",
            auth_router(AuthState::new(
                auth_service,
                ctx.rate_limits.clone(),
                ctx.settings.cookies,
            )),
        )
        .nest("/api/sounds", sounds_router(sounds_state.clone()))
        .nest("/api/sound-profiles", sound_profiles_router(sounds_state))
        .nest(
            "/api/upload-sound",
            upload_router(UploadState::new(
                sound_service,
                ctx.settings.upload_require_admin,
            )),
        )
        .nest(
            "/api/send-email",
            contact_router(ContactState::new(contact_service, ctx.rate_limits.clone())),
        )
        .nest(
            "/api/survey-participants",
            survey_router(SurveyState::new(survey_service, ctx.rate_limits)),
        )
        .nest(
            "/health",
            health_router(HealthState::new(HealthService::new(ctx.auth))),
        )
        .layer(middleware::from_fn_with_state(resolver, resolve_session))
}

// ========== Shared request/response helpers ==========

/// JSON body extractor whose rejection is an [`ApiError`]
///
/// Malformed bodies answer with the usual `{ success: false, ... }` shape
/// instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Successful response body: `{ "success": true, ...data }`
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

/// Payload carrying only a human-readable message
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

pub fn message(message: &'static str) -> Json<Success<MessageBody>> {
    success(MessageBody { message })
}

/// Parse a UUID supplied by the client
pub fn parse_id(value: &str, field: &'static str) -> ApiResult<Uuid> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::MissingField(field));
    }
    Uuid::parse_str(value)
        .map_err(|_| ApiError::ValidationError(format!("{} must be a valid UUID", field)))
}
