//! One-time password reset codes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of the `password_reset_codes` table
///
/// Only the SHA-256 hex digest of the code is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordResetCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `password_reset_codes`
#[derive(Debug, Clone, Serialize)]
pub struct NewPasswordResetCode {
    pub user_id: Uuid,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}
