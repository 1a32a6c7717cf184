//! Sound assets and the profiles grouping them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of the `sound_profiles` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundProfile {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `sound_profiles`
#[derive(Debug, Clone, Serialize)]
pub struct NewSoundProfile {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// Row of the `sounds` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub category: String,
    /// Object path inside the storage bucket
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `sounds`
#[derive(Debug, Clone, Serialize)]
pub struct NewSound {
    pub profile_id: Uuid,
    pub name: String,
    pub category: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
}
