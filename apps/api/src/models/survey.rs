//! Survey participants collected from the public site

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of the `survey_participants` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyParticipant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub profile_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `survey_participants`
#[derive(Debug, Clone, Serialize)]
pub struct NewSurveyParticipant {
    pub name: String,
    pub email: String,
    pub profile_id: Option<Uuid>,
    pub notes: Option<String>,
}
