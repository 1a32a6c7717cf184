//! Survey participant repository

use std::sync::Arc;

use soundbank_backend_client::{Access, BackendResult, Database, Filter, Query};
use uuid::Uuid;

use crate::models::{NewSurveyParticipant, SurveyParticipant};
use crate::repositories::utils::{decode_row, encode, SURVEY_PARTICIPANTS};

/// Repository for `survey_participants` rows
#[derive(Clone)]
pub struct SurveyRepository {
    db: Arc<dyn Database>,
}

impl SurveyRepository {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, participant: &NewSurveyParticipant) -> BackendResult<SurveyParticipant> {
        let row = self
            .db
            .insert(SURVEY_PARTICIPANTS, encode(participant)?, &Access::Service)
            .await?;
        decode_row(SURVEY_PARTICIPANTS, row)
    }

    /// Delete one participant; returns the number of rows removed
    pub async fn delete_by_id(&self, id: Uuid) -> BackendResult<usize> {
        let query = Query::table(SURVEY_PARTICIPANTS).filter(Filter::eq("id", id));
        Ok(self.db.delete(&query, &Access::Service).await?.len())
    }
}
