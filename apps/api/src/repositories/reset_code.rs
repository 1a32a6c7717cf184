//! Password reset code repository

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use soundbank_backend_client::{Access, BackendResult, Database, Filter, Query};
use uuid::Uuid;

use crate::models::{NewPasswordResetCode, PasswordResetCode};
use crate::repositories::utils::{decode_row, encode, first_row, PASSWORD_RESET_CODES};

/// Repository for `password_reset_codes` rows
///
/// Codes are only ever touched with the service role.
#[derive(Clone)]
pub struct ResetCodeRepository {
    db: Arc<dyn Database>,
}

impl ResetCodeRepository {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, code: &NewPasswordResetCode) -> BackendResult<PasswordResetCode> {
        let row = self
            .db
            .insert(PASSWORD_RESET_CODES, encode(code)?, &Access::Service)
            .await?;
        decode_row(PASSWORD_RESET_CODES, row)
    }

    /// Find an unused, unexpired code for `user_id` matching `code_hash`
    pub async fn find_active(
        &self,
        user_id: Uuid,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> BackendResult<Option<PasswordResetCode>> {
        let query = Query::table(PASSWORD_RESET_CODES)
            .filter(Filter::eq("user_id", user_id))
            .filter(Filter::eq("code_hash", code_hash))
            .filter(Filter::is("used", Some(false)))
            .filter(Filter::gt(
                "expires_at",
                now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ))
            .limit(1);
        first_row(
            PASSWORD_RESET_CODES,
            self.db.select(&query, &Access::Service).await?,
        )
    }

    /// Mark a code used if it still is unused
    ///
    /// Returns false when another request consumed it first.
    pub async fn mark_used(&self, id: Uuid) -> BackendResult<bool> {
        let query = Query::table(PASSWORD_RESET_CODES)
            .filter(Filter::eq("id", id))
            .filter(Filter::is("used", Some(false)));
        let updated = self
            .db
            .update(&query, json!({ "used": true }), &Access::Service)
            .await?;
        Ok(!updated.is_empty())
    }
}
