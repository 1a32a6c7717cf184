//! Sound library management
//!
//! Sounds are audio files in object storage plus a metadata row each;
//! profiles group sounds. Deletes remove storage objects first, then child
//! rows, then the parent row, so a row never points at a file that is gone.
//! A failed step aborts the rest and may leave orphaned files behind, which
//! are harmless and can be cleaned up separately.

use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use soundbank_backend_client::ObjectStorage;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{NewSound, NewSoundProfile, Sound, SoundProfile};
use crate::repositories::{SoundProfileRepository, SoundRepository};

/// Default upload limit: 5 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    /// Map an allowed MIME type to its format
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "audio/mpeg" => Some(Self::Mp3),
            "audio/wav" => Some(Self::Wav),
            "audio/ogg" => Some(Self::Ogg),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Ogg => "audio/ogg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
        }
    }
}

/// Lowercase ASCII slug: alphanumeric runs joined by single hyphens
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Storage path for a new upload:
/// `{profile_id}/{category_slug}/{name_slug}-{8 hex}.{ext}`
pub fn storage_path(profile_id: Uuid, category: &str, name: &str, format: AudioFormat) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!(
        "{}/{}/{}-{:08x}.{}",
        profile_id,
        slugify(category),
        slugify(name),
        suffix,
        format.extension()
    )
}

/// A file upload whose fields have been read from the request
#[derive(Debug, Clone)]
pub struct SoundUpload {
    pub name: String,
    pub profile_id: Uuid,
    pub category: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Sound and profile operations against storage and the database
#[derive(Clone)]
pub struct SoundService {
    sounds: SoundRepository,
    profiles: SoundProfileRepository,
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
    max_upload_bytes: usize,
}

impl SoundService {
    pub fn new(
        sounds: SoundRepository,
        profiles: SoundProfileRepository,
        storage: Arc<dyn ObjectStorage>,
        bucket: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            sounds,
            profiles,
            storage,
            bucket: bucket.into(),
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// List sounds, newest first
    pub async fn list(&self, profile_id: Option<Uuid>) -> ApiResult<Vec<Sound>> {
        self.sounds
            .list(profile_id)
            .await
            .map_err(ApiError::upstream("Failed to load sounds"))
    }

    /// Create a sound profile; the slug is derived from the name
    pub async fn create_profile(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<SoundProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::MissingField("name"));
        }
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(ApiError::ValidationError(
                "name must contain letters or digits".to_string(),
            ));
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let profile = self
            .profiles
            .create(&NewSoundProfile {
                name: name.to_string(),
                slug,
                description,
            })
            .await
            .map_err(ApiError::upstream("Failed to create profile"))?;

        tracing::info!(profile_id = %profile.id, slug = %profile.slug, "Sound profile created");
        Ok(profile)
    }

    /// Check an upload's MIME type against the allow-list
    pub fn check_content_type(&self, content_type: &str) -> ApiResult<AudioFormat> {
        AudioFormat::from_mime(content_type).ok_or_else(|| {
            ApiError::ValidationError(format!(
                "unsupported file type '{}'; allowed: audio/mpeg, audio/wav, audio/ogg",
                content_type
            ))
        })
    }

    /// Check an upload's MIME type and size before its body is stored
    pub fn validate_upload(&self, content_type: &str, size: usize) -> ApiResult<AudioFormat> {
        let format = self.check_content_type(content_type)?;
        if size == 0 {
            return Err(ApiError::ValidationError("file is empty".to_string()));
        }
        if size > self.max_upload_bytes {
            return Err(self.too_large());
        }
        Ok(format)
    }

    pub fn too_large(&self) -> ApiError {
        ApiError::ValidationError(format!(
            "file exceeds the {} byte limit",
            self.max_upload_bytes
        ))
    }

    /// Store an uploaded file and record its metadata
    ///
    /// The object is written before the row. If the row insert fails the
    /// object stays in storage unreferenced.
    pub async fn upload(&self, upload: SoundUpload) -> ApiResult<Sound> {
        let format = self.validate_upload(&upload.content_type, upload.data.len())?;

        let name = upload.name.trim();
        if name.is_empty() {
            return Err(ApiError::MissingField("name"));
        }
        let category = upload.category.trim();
        if category.is_empty() {
            return Err(ApiError::MissingField("category"));
        }
        if slugify(name).is_empty() || slugify(category).is_empty() {
            return Err(ApiError::ValidationError(
                "name and category must contain letters or digits".to_string(),
            ));
        }

        self.profiles
            .find_by_id(upload.profile_id)
            .await
            .map_err(ApiError::upstream("Failed to load profile"))?
            .ok_or_else(|| ApiError::not_found("profile", upload.profile_id.to_string()))?;

        let path = storage_path(upload.profile_id, category, name, format);
        let size_bytes = upload.data.len() as i64;

        self.storage
            .upload(&self.bucket, &path, upload.data, format.mime_type())
            .await
            .map_err(ApiError::upstream("Failed to upload file"))?;

        let sound = self
            .sounds
            .create(&NewSound {
                profile_id: upload.profile_id,
                name: name.to_string(),
                category: category.to_string(),
                storage_path: path.clone(),
                mime_type: format.mime_type().to_string(),
                size_bytes,
            })
            .await
            .map_err(|e| {
                tracing::warn!(path = %path, "Sound row insert failed after upload; file left in storage");
                ApiError::upstream("Failed to save sound metadata")(e)
            })?;

        tracing::info!(sound_id = %sound.id, path = %sound.storage_path, size_bytes, "Sound uploaded");
        Ok(sound)
    }

    /// Delete a sound: its file, then its row
    pub async fn delete_sound(&self, id: Uuid) -> ApiResult<()> {
        let sound = self
            .sounds
            .find_by_id(id)
            .await
            .map_err(ApiError::upstream("Failed to load sound"))?
            .ok_or_else(|| ApiError::not_found("sound", id.to_string()))?;

        self.storage
            .remove(&self.bucket, &[sound.storage_path.clone()])
            .await
            .map_err(ApiError::upstream("Failed to delete sound file"))?;

        self.sounds
            .delete_by_id(id)
            .await
            .map_err(ApiError::upstream("Failed to delete sound record"))?;

        tracing::info!(sound_id = %id, path = %sound.storage_path, "Sound deleted");
        Ok(())
    }

    /// Delete a profile: every sound file, then the sound rows, then the
    /// profile row
    pub async fn delete_profile(&self, id: Uuid) -> ApiResult<()> {
        self.profiles
            .find_by_id(id)
            .await
            .map_err(ApiError::upstream("Failed to load profile"))?
            .ok_or_else(|| ApiError::not_found("profile", id.to_string()))?;

        let paths = self
            .sounds
            .storage_paths_for_profile(id)
            .await
            .map_err(ApiError::upstream("Failed to load profile sounds"))?;

        self.storage
            .remove(&self.bucket, &paths)
            .await
            .map_err(ApiError::upstream("Failed to delete profile files"))?;

        let removed = self
            .sounds
            .delete_by_profile(id)
            .await
            .map_err(ApiError::upstream("Failed to delete profile sounds"))?;

        self.profiles
            .delete_by_id(id)
            .await
            .map_err(ApiError::upstream("Failed to delete profile"))?;

        tracing::info!(profile_id = %id, files = paths.len(), sounds = removed, "Sound profile deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use serde_json::json;
    use soundbank_test_utils::InMemoryBackend;

    const BUCKET: &str = "sounds";

    fn service(backend: &InMemoryBackend) -> SoundService {
        let db = Arc::new(backend.clone());
        SoundService::new(
            SoundRepository::new(db.clone()),
            SoundProfileRepository::new(db),
            Arc::new(backend.clone()),
            BUCKET,
            DEFAULT_MAX_UPLOAD_BYTES,
        )
    }

    fn seed_profile(backend: &InMemoryBackend) -> Uuid {
        let row = backend.seed_row(
            "sound_profiles",
            json!({"name": "Forest", "slug": "forest", "description": null}),
        );
        serde_json::from_value(row["id"].clone()).unwrap()
    }

    fn seed_sound(backend: &InMemoryBackend, profile_id: Uuid, path: &'static str) -> Uuid {
        backend.put_object(BUCKET, path, b"RIFF", "audio/wav");
        let row = backend.seed_row(
            "sounds",
            json!({
                "profile_id": profile_id,
                "name": "Rain",
                "category": "Weather",
                "storage_path": path,
                "mime_type": "audio/wav",
                "size_bytes": 4,
            }),
        );
        serde_json::from_value(row["id"].clone()).unwrap()
    }

    fn wav_upload(profile_id: Uuid) -> SoundUpload {
        SoundUpload {
            name: "Morning Birds".to_string(),
            profile_id,
            category: "Nature / Ambient".to_string(),
            content_type: "audio/wav".to_string(),
            data: Bytes::from_static(b"RIFF....WAVE"),
        }
    }

    #[rstest]
    #[case("Morning Birds", "morning-birds")]
    #[case("  Rain -- on   Tin Roof! ", "rain-on-tin-roof")]
    #[case("Café Ambience", "caf-ambience")]
    #[case("***", "")]
    fn test_slugify(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[rstest]
    #[case("audio/mpeg", Some(AudioFormat::Mp3))]
    #[case("audio/wav", Some(AudioFormat::Wav))]
    #[case("audio/ogg; codecs=vorbis", Some(AudioFormat::Ogg))]
    #[case("AUDIO/MPEG", Some(AudioFormat::Mp3))]
    #[case("audio/flac", None)]
    #[case("text/plain", None)]
    fn test_audio_format_from_mime(#[case] mime: &str, #[case] expected: Option<AudioFormat>) {
        assert_eq!(AudioFormat::from_mime(mime), expected);
    }

    #[test]
    fn test_storage_path_shape() {
        let profile_id = Uuid::new_v4();
        let path = storage_path(profile_id, "Nature / Ambient", "Morning Birds", AudioFormat::Mp3);

        let prefix = format!("{}/nature-ambient/morning-birds-", profile_id);
        assert!(path.starts_with(&prefix), "{}", path);
        assert!(path.ends_with(".mp3"));
        let suffix = &path[prefix.len()..path.len() - 4];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_validate_upload_limits() {
        let backend = InMemoryBackend::new();
        let sounds = service(&backend);

        assert_matches!(sounds.validate_upload("audio/mpeg", 1024), Ok(AudioFormat::Mp3));
        assert_matches!(
            sounds.validate_upload("audio/mpeg", DEFAULT_MAX_UPLOAD_BYTES),
            Ok(_)
        );
        assert_matches!(
            sounds.validate_upload("audio/mpeg", DEFAULT_MAX_UPLOAD_BYTES + 1),
            Err(ApiError::ValidationError(_))
        );
        assert_matches!(
            sounds.validate_upload("video/mp4", 10),
            Err(ApiError::ValidationError(_))
        );
        assert_matches!(
            sounds.validate_upload("audio/ogg", 0),
            Err(ApiError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn test_upload_writes_object_then_row() {
        let backend = InMemoryBackend::new();
        let profile_id = seed_profile(&backend);

        let sound = service(&backend).upload(wav_upload(profile_id)).await.unwrap();

        assert_eq!(sound.mime_type, "audio/wav");
        assert_eq!(sound.size_bytes, 12);
        let object = backend.object(BUCKET, &sound.storage_path).unwrap();
        assert_eq!(object.data, Bytes::from_static(b"RIFF....WAVE"));
        assert!(
            backend.call_position("storage.upload:sounds")
                < backend.call_position("db.insert:sounds")
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_type_before_any_call() {
        let backend = InMemoryBackend::new();
        let mut upload = wav_upload(Uuid::new_v4());
        upload.content_type = "application/pdf".to_string();

        let result = service(&backend).upload(upload).await;
        assert_matches!(result, Err(ApiError::ValidationError(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_unknown_profile() {
        let backend = InMemoryBackend::new();

        let result = service(&backend).upload(wav_upload(Uuid::new_v4())).await;
        assert_matches!(result, Err(ApiError::NotFound { resource_type: "profile", .. }));
        assert_eq!(backend.call_count("storage.upload"), 0);
    }

    #[tokio::test]
    async fn test_upload_row_failure_leaves_object() {
        let backend = InMemoryBackend::new();
        let profile_id = seed_profile(&backend);
        backend.fail_inserts_on("sounds");

        let err = service(&backend)
            .upload(wav_upload(profile_id))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Failed to save sound metadata");
        assert_eq!(backend.object_paths(BUCKET).len(), 1);
        assert!(backend.rows("sounds").is_empty());
    }

    #[tokio::test]
    async fn test_delete_sound_removes_file_before_row() {
        let backend = InMemoryBackend::new();
        let profile_id = seed_profile(&backend);
        let id = seed_sound(&backend, profile_id, "p/weather/rain-00000000.wav");

        service(&backend).delete_sound(id).await.unwrap();

        assert!(backend.rows("sounds").is_empty());
        assert!(backend.object(BUCKET, "p/weather/rain-00000000.wav").is_none());
        let remove = backend.call_position("storage.remove:sounds").unwrap();
        let delete = backend.call_position("db.delete:sounds").unwrap();
        assert!(remove < delete);
    }

    #[tokio::test]
    async fn test_delete_sound_storage_failure_keeps_row() {
        let backend = InMemoryBackend::new();
        let profile_id = seed_profile(&backend);
        let id = seed_sound(&backend, profile_id, "p/weather/rain-00000000.wav");
        backend.fail_storage_remove();

        let err = service(&backend).delete_sound(id).await.unwrap_err();

        assert_eq!(err.public_message(), "Failed to delete sound file");
        assert_eq!(backend.rows("sounds").len(), 1);
        assert_eq!(backend.call_count("db.delete"), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_sound() {
        let backend = InMemoryBackend::new();

        let result = service(&backend).delete_sound(Uuid::new_v4()).await;
        assert_matches!(result, Err(ApiError::NotFound { resource_type: "sound", .. }));
        assert_eq!(backend.call_count("storage.remove"), 0);
    }

    #[tokio::test]
    async fn test_delete_profile_phases_in_order() {
        let backend = InMemoryBackend::new();
        let profile_id = seed_profile(&backend);
        seed_sound(&backend, profile_id, "p/weather/rain-00000001.wav");
        seed_sound(&backend, profile_id, "p/weather/rain-00000002.wav");

        service(&backend).delete_profile(profile_id).await.unwrap();

        assert!(backend.object_paths(BUCKET).is_empty());
        assert!(backend.rows("sounds").is_empty());
        assert!(backend.rows("sound_profiles").is_empty());

        let storage = backend.call_position("storage.remove:sounds").unwrap();
        let children = backend.call_position("db.delete:sounds").unwrap();
        let parent = backend.call_position("db.delete:sound_profiles").unwrap();
        assert!(storage < children && children < parent);
    }

    #[tokio::test]
    async fn test_delete_profile_child_failure_keeps_parent() {
        let backend = InMemoryBackend::new();
        let profile_id = seed_profile(&backend);
        seed_sound(&backend, profile_id, "p/weather/rain-00000001.wav");
        backend.fail_deletes_on("sounds");

        let err = service(&backend).delete_profile(profile_id).await.unwrap_err();

        assert_eq!(err.public_message(), "Failed to delete profile sounds");
        assert_eq!(backend.rows("sound_profiles").len(), 1);
        assert_eq!(backend.call_count("db.delete:sound_profiles"), 0);
    }

    #[tokio::test]
    async fn test_create_profile_derives_slug() {
        let backend = InMemoryBackend::new();

        let profile = service(&backend)
            .create_profile(" Deep Forest ", Some("  "))
            .await
            .unwrap();
        assert_eq!(profile.slug, "deep-forest");
        assert_eq!(profile.name, "Deep Forest");
        assert!(profile.description.is_none());
    }
}
