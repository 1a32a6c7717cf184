//! User repository

use std::sync::Arc;

use soundbank_backend_client::{Access, BackendResult, Database, Filter, Query};
use uuid::Uuid;

use crate::models::User;
use crate::repositories::utils::{first_row, normalize_email, USERS};

/// Repository for `users` rows
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<dyn Database>,
}

impl UserRepository {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Find a user by id with the given credentials
    ///
    /// With `Access::User` the row-level rules of the caller apply; a denial
    /// surfaces as `BackendError::AccessDenied`, distinct from `Ok(None)`.
    pub async fn find_by_id(&self, user_id: Uuid, access: &Access) -> BackendResult<Option<User>> {
        let query = Query::table(USERS)
            .filter(Filter::eq("id", user_id))
            .limit(1);
        first_row(USERS, self.db.select(&query, access).await?)
    }

    /// Find a user by email (case-insensitive), with the service role
    pub async fn find_by_email(&self, email: &str) -> BackendResult<Option<User>> {
        let query = Query::table(USERS)
            .filter(Filter::eq("email", normalize_email(email)))
            .limit(1);
        first_row(USERS, self.db.select(&query, &Access::Service).await?)
    }
}
