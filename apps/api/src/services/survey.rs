//! Survey sign-ups

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{NewSurveyParticipant, SurveyParticipant};
use crate::repositories::SurveyRepository;
use crate::services::auth::validate_email;

const MAX_NOTES_CHARS: usize = 2000;

#[derive(Clone)]
pub struct SurveyService {
    participants: SurveyRepository,
}

impl SurveyService {
    pub fn new(participants: SurveyRepository) -> Self {
        Self { participants }
    }

    /// Validate a sign-up without touching the backend
    pub fn validate(
        name: &str,
        email: &str,
        profile_id: Option<Uuid>,
        notes: Option<&str>,
    ) -> ApiResult<NewSurveyParticipant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::MissingField("name"));
        }
        validate_email(email)?;
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS) {
            return Err(ApiError::ValidationError(format!(
                "notes must be at most {} characters",
                MAX_NOTES_CHARS
            )));
        }

        Ok(NewSurveyParticipant {
            name: name.to_string(),
            email: email.trim().to_lowercase(),
            profile_id,
            notes: notes.map(str::to_string),
        })
    }

    pub async fn create(&self, participant: &NewSurveyParticipant) -> ApiResult<SurveyParticipant> {
        let created = self
            .participants
            .create(participant)
            .await
            .map_err(ApiError::upstream("Failed to save survey participant"))?;
        tracing::info!(participant_id = %created.id, "Survey participant registered");
        Ok(created)
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let removed = self
            .participants
            .delete_by_id(id)
            .await
            .map_err(ApiError::upstream("Failed to delete survey participant"))?;
        if removed == 0 {
            return Err(ApiError::not_found("survey participant", id.to_string()));
        }
        tracing::info!(participant_id = %id, "Survey participant deleted");
        Ok(())
    }
}
