//! Sound profile route handlers
//!
//! - `POST /api/sound-profiles` - Create a profile (admin, API limit)
//! - `DELETE /api/sound-profiles/:id` - Delete a profile with all its sounds (admin, DELETE limit)

use axum::{
    extract::{Path, State},
    middleware,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::middleware::rate_limit::{rate_limit, ActionCategory};
use crate::middleware::AdminUser;
use crate::models::SoundProfile;
use crate::routes::sounds::SoundsState;
use crate::routes::{message, parse_id, success, ApiJson, MessageBody, Success};

/// Create sound profiles router
pub fn sound_profiles_router(state: SoundsState) -> Router {
    let create = Router::new()
        .route("/", post(create_profile))
        .route_layer(middleware::from_fn_with_state(
            (state.rate_limits.clone(), ActionCategory::Api),
            rate_limit,
        ));

    let remove = Router::new()
        .route("/:id", delete(delete_profile))
        .route_layer(middleware::from_fn_with_state(
            (state.rate_limits.clone(), ActionCategory::Delete),
            rate_limit,
        ));

    Router::new().merge(create).merge(remove).with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateProfileRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody {
    pub profile: SoundProfile,
}

async fn create_profile(
    State(state): State<SoundsState>,
    admin: AdminUser,
    ApiJson(body): ApiJson<CreateProfileRequest>,
) -> ApiResult<Json<Success<ProfileBody>>> {
    let profile = state
        .sounds
        .create_profile(&body.name, body.description.as_deref())
        .await?;

    tracing::debug!(admin_id = %admin.user.id, profile_id = %profile.id, "Profile created by admin");
    Ok(success(ProfileBody { profile }))
}

/// Delete a profile: sound files, then sound rows, then the profile row
async fn delete_profile(
    State(state): State<SoundsState>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<MessageBody>>> {
    let id = parse_id(&id, "id")?;

    tracing::info!(admin_id = %admin.user.id, profile_id = %id, "Deleting sound profile");
    state.sounds.delete_profile(id).await?;

    Ok(message("Profile deleted"))
}
