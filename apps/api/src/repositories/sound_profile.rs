//! Sound profile repository

use std::sync::Arc;

use soundbank_backend_client::{Access, BackendResult, Database, Filter, Query};
use uuid::Uuid;

use crate::models::{NewSoundProfile, SoundProfile};
use crate::repositories::utils::{decode_row, encode, first_row, SOUND_PROFILES};

/// Repository for `sound_profiles` rows
#[derive(Clone)]
pub struct SoundProfileRepository {
    db: Arc<dyn Database>,
}

impl SoundProfileRepository {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> BackendResult<Option<SoundProfile>> {
        let query = Query::table(SOUND_PROFILES)
            .filter(Filter::eq("id", id))
            .limit(1);
        first_row(SOUND_PROFILES, self.db.select(&query, &Access::Service).await?)
    }

    pub async fn create(&self, profile: &NewSoundProfile) -> BackendResult<SoundProfile> {
        let row = self
            .db
            .insert(SOUND_PROFILES, encode(profile)?, &Access::Service)
            .await?;
        decode_row(SOUND_PROFILES, row)
    }

    /// Delete one profile; returns the number of rows removed
    pub async fn delete_by_id(&self, id: Uuid) -> BackendResult<usize> {
        let query = Query::table(SOUND_PROFILES).filter(Filter::eq("id", id));
        Ok(self.db.delete(&query, &Access::Service).await?.len())
    }
}
