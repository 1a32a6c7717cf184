//! Shared helpers for repositories

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use soundbank_backend_client::{BackendError, BackendResult};

// Table names

pub const USERS: &str = "users";
pub const SOUNDS: &str = "sounds";
pub const SOUND_PROFILES: &str = "sound_profiles";
pub const SURVEY_PARTICIPANTS: &str = "survey_participants";
pub const PASSWORD_RESET_CODES: &str = "password_reset_codes";

/// Decode one row into a record
pub fn decode_row<T: DeserializeOwned>(table: &str, row: Value) -> BackendResult<T> {
    serde_json::from_value(row).map_err(|e| {
        BackendError::InvalidResponse(format!("malformed {} row: {}", table, e))
    })
}

/// Decode every row into records
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> BackendResult<Vec<T>> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

/// Decode the first row, if any
pub fn first_row<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> BackendResult<Option<T>> {
    rows.into_iter()
        .next()
        .map(|row| decode_row(table, row))
        .transpose()
}

/// Encode an insert payload
pub fn encode<T: Serialize>(record: &T) -> BackendResult<Value> {
    Ok(serde_json::to_value(record)?)
}

/// Normalize an email address for lookups and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
