//! Sound library route handlers
//!
//! - `GET /api/sounds` - List sounds, optionally for one profile (API limit)
//! - `POST /api/sounds/delete` - Delete a sound and its file (admin, DELETE limit)

use axum::{
    extract::{Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::middleware::rate_limit::{rate_limit, ActionCategory, RateLimitState};
use crate::middleware::AdminUser;
use crate::models::Sound;
use crate::routes::{message, parse_id, success, ApiJson, MessageBody, Success};
use crate::services::SoundService;

/// Shared state for sound and sound profile handlers
#[derive(Clone)]
pub struct SoundsState {
    pub sounds: SoundService,
    pub rate_limits: RateLimitState,
}

impl SoundsState {
    pub fn new(sounds: SoundService, rate_limits: RateLimitState) -> Self {
        Self { sounds, rate_limits }
    }
}

/// Create sounds router
pub fn sounds_router(state: SoundsState) -> Router {
    let list = Router::new()
        .route("/", get(list_sounds))
        .route_layer(middleware::from_fn_with_state(
            (state.rate_limits.clone(), ActionCategory::Api),
            rate_limit,
        ));

    let delete = Router::new()
        .route("/delete", post(delete_sound))
        .route_layer(middleware::from_fn_with_state(
            (state.rate_limits.clone(), ActionCategory::Delete),
            rate_limit,
        ));

    Router::new().merge(list).merge(delete).with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListSoundsQuery {
    pub profile_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteSoundRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct SoundsBody {
    pub sounds: Vec<Sound>,
}

async fn list_sounds(
    State(state): State<SoundsState>,
    query: Result<Query<ListSoundsQuery>, axum::extract::rejection::QueryRejection>,
) -> ApiResult<Json<Success<SoundsBody>>> {
    let Query(query) = query?;
    let profile_id = query
        .profile_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .map(|id| parse_id(id, "profileId"))
        .transpose()?;

    let sounds = state.sounds.list(profile_id).await?;
    Ok(success(SoundsBody { sounds }))
}

/// Delete a sound
///
/// The file is removed from storage before the row; if storage fails the
/// row stays and the request answers 500.
async fn delete_sound(
    State(state): State<SoundsState>,
    admin: AdminUser,
    ApiJson(body): ApiJson<DeleteSoundRequest>,
) -> ApiResult<Json<Success<MessageBody>>> {
    let id = parse_id(&body.id, "id")?;

    tracing::info!(admin_id = %admin.user.id, sound_id = %id, "Deleting sound");
    state.sounds.delete_sound(id).await?;

    Ok(message("Sound deleted"))
}
