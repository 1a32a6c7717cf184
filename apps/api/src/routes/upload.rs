//! Sound upload route handler
//!
//! `POST /api/upload-sound` takes `multipart/form-data` with the fields
//! `file`, `name`, `profileId` and `category`. The file's MIME type is
//! checked before its body is read, and reading stops as soon as the size
//! limit is passed.

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    routing::post,
    Json, Router,
};
use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::middleware::MaybeAuthUser;
use crate::models::Sound;
use crate::routes::{parse_id, success, Success};
use crate::services::{SoundService, SoundUpload};

/// Headroom over the file limit for the other form fields and boundaries
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct UploadState {
    pub sounds: SoundService,
    /// Reject callers without an admin session
    pub require_admin: bool,
}

impl UploadState {
    pub fn new(sounds: SoundService, require_admin: bool) -> Self {
        Self {
            sounds,
            require_admin,
        }
    }
}

/// Create upload router
///
/// The body limit sits above the file limit so oversized files are answered
/// by the handler with a 400 instead of the framework's 413.
pub fn upload_router(state: UploadState) -> Router {
    let body_limit = state
        .sounds
        .max_upload_bytes()
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", post(upload_sound))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct SoundBody {
    pub sound: Sound,
}

/// A `file` part read up to the size limit
struct FilePart {
    content_type: String,
    data: Bytes,
}

async fn upload_sound(
    State(state): State<UploadState>,
    auth: MaybeAuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Success<SoundBody>>> {
    if state.require_admin {
        let admin = auth.require_admin()?;
        tracing::debug!(admin_id = %admin.id, "Upload by admin");
    }
    let mut multipart = multipart?;

    let mut file = None;
    let mut name = None;
    let mut profile_id = None;
    let mut category = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => file = Some(read_file(&state.sounds, field).await?),
            Some("name") => name = Some(field.text().await?),
            Some("profileId") => profile_id = Some(field.text().await?),
            Some("category") => category = Some(field.text().await?),
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown upload field");
            }
        }
    }

    let file = file.ok_or(ApiError::MissingField("file"))?;
    let name = name.ok_or(ApiError::MissingField("name"))?;
    let profile_id = parse_id(
        &profile_id.ok_or(ApiError::MissingField("profileId"))?,
        "profileId",
    )?;
    let category = category.ok_or(ApiError::MissingField("category"))?;

    let sound = state
        .sounds
        .upload(SoundUpload {
            name,
            profile_id,
            category,
            content_type: file.content_type,
            data: file.data,
        })
        .await?;

    Ok(success(SoundBody { sound }))
}

/// Check the part's MIME type, then read it chunk by chunk up to the limit
async fn read_file(sounds: &SoundService, mut field: Field<'_>) -> ApiResult<FilePart> {
    let content_type = field
        .content_type()
        .map(str::to_string)
        .ok_or_else(|| ApiError::ValidationError("file has no content type".to_string()))?;
    sounds.check_content_type(&content_type)?;

    let limit = sounds.max_upload_bytes();
    let mut data = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        if data.len() + chunk.len() > limit {
            return Err(sounds.too_large());
        }
        data.extend_from_slice(&chunk);
    }

    Ok(FilePart {
        content_type,
        data: data.freeze(),
    })
}
