//! Sound repository

use std::sync::Arc;

use soundbank_backend_client::{Access, BackendResult, Database, Filter, Order, Query};
use uuid::Uuid;

use crate::models::{NewSound, Sound};
use crate::repositories::utils::{decode_row, decode_rows, encode, first_row, SOUNDS};

/// Repository for `sounds` rows
#[derive(Clone)]
pub struct SoundRepository {
    db: Arc<dyn Database>,
}

impl SoundRepository {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// List sounds, newest first, optionally for one profile
    pub async fn list(&self, profile_id: Option<Uuid>) -> BackendResult<Vec<Sound>> {
        let mut query = Query::table(SOUNDS).order_by("created_at", Order::Desc);
        if let Some(profile_id) = profile_id {
            query = query.filter(Filter::eq("profile_id", profile_id));
        }
        decode_rows(SOUNDS, self.db.select(&query, &Access::Service).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> BackendResult<Option<Sound>> {
        let query = Query::table(SOUNDS).filter(Filter::eq("id", id)).limit(1);
        first_row(SOUNDS, self.db.select(&query, &Access::Service).await?)
    }

    /// Storage paths of every sound in a profile
    pub async fn storage_paths_for_profile(&self, profile_id: Uuid) -> BackendResult<Vec<String>> {
        let query = Query::table(SOUNDS).filter(Filter::eq("profile_id", profile_id));
        let sounds: Vec<Sound> =
            decode_rows(SOUNDS, self.db.select(&query, &Access::Service).await?)?;
        Ok(sounds.into_iter().map(|s| s.storage_path).collect())
    }

    pub async fn create(&self, sound: &NewSound) -> BackendResult<Sound> {
        let row = self
            .db
            .insert(SOUNDS, encode(sound)?, &Access::Service)
            .await?;
        decode_row(SOUNDS, row)
    }

    /// Delete one sound; returns the number of rows removed
    pub async fn delete_by_id(&self, id: Uuid) -> BackendResult<usize> {
        let query = Query::table(SOUNDS).filter(Filter::eq("id", id));
        Ok(self.db.delete(&query, &Access::Service).await?.len())
    }

    /// Delete every sound in a profile; returns the number of rows removed
    pub async fn delete_by_profile(&self, profile_id: Uuid) -> BackendResult<usize> {
        let query = Query::table(SOUNDS).filter(Filter::eq("profile_id", profile_id));
        Ok(self.db.delete(&query, &Access::Service).await?.len())
    }
}
