//! In-memory fake of the hosted backend
//!
//! [`InMemoryBackend`] implements every backend trait against process memory.
//! Besides the happy path it records the order of calls made against it and
//! lets a test inject the failure modes the API has to survive.
//!
//! # Lock Poisoning Recovery
//!
//! Locks are taken with `unwrap_or_else(|e| e.into_inner())`, so a test that
//! panics mid-call (see [`InMemoryBackend::panic_on_get_user`]) does not
//! poison the fake for the rest of the test.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use soundbank_backend_client::{
    Access, AuthIdentity, AuthProvider, AuthSession, BackendError, BackendResult, Database, Email,
    Mailer, ObjectStorage, Query,
};
use uuid::Uuid;

use crate::filter::{arrange, matches_all};

/// A file held by the fake object storage
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone)]
struct Account {
    id: Uuid,
    email: String,
    password: String,
}

#[derive(Debug, Default)]
struct Faults {
    storage_remove: bool,
    storage_upload: bool,
    mail: bool,
    auth_unavailable: bool,
    misconfigured: bool,
    panic_on_get_user: bool,
    denied_tables: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_inserts: HashSet<String>,
}

#[derive(Debug, Default)]
struct State {
    accounts: Vec<Account>,
    tokens: HashMap<String, Uuid>,
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<(String, String), StoredObject>,
    sent: Vec<Email>,
    calls: Vec<String>,
    faults: Faults,
}

/// In-memory implementation of `AuthProvider`, `Database`, `ObjectStorage`
/// and `Mailer`
///
/// Clones share the same state, so a test keeps one handle for inspection
/// and hands another to the application.
///
/// Every trait call is appended to a call log as `"<surface>.<op>"`, with
/// `":<table or bucket>"` where one applies (for example `"db.delete:sounds"`
/// or `"storage.remove:sounds"`).
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

fn unavailable(what: &str) -> BackendError {
    BackendError::ApiError {
        status: 503,
        message: format!("{} unavailable", what),
    }
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: impl Into<String>) {
        self.lock().calls.push(call.into());
    }

    // ---- seeding ------------------------------------------------------

    /// Register an auth account and its `users` row; returns the user id
    pub fn add_user(&self, email: &str, password: &str, role: &str) -> Uuid {
        let id = self.add_auth_account(email, password);
        self.seed_row(
            "users",
            json!({
                "id": id,
                "email": email,
                "role": role,
                "client_id": null,
                "created_at": Utc::now(),
            }),
        );
        id
    }

    /// Register an auth account without a `users` row
    pub fn add_auth_account(&self, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().accounts.push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    /// Mint a session token for an existing account
    pub fn issue_token(&self, user_id: Uuid) -> String {
        let token = format!("token-{}", Uuid::new_v4().simple());
        self.lock().tokens.insert(token.clone(), user_id);
        token
    }

    /// Invalidate a token as if it had expired
    pub fn expire_token(&self, token: &str) {
        self.lock().tokens.remove(token);
    }

    /// Whether a token is still accepted by the auth service
    pub fn token_is_active(&self, token: &str) -> bool {
        self.lock().tokens.contains_key(token)
    }

    /// Insert a row directly, bypassing the call log; returns the stored row
    pub fn seed_row(&self, table: &str, row: Value) -> Value {
        let row = with_defaults(row);
        self.lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    /// Store an object directly, bypassing the call log
    pub fn put_object(&self, bucket: &str, path: &str, data: &'static [u8], content_type: &str) {
        self.lock().objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                data: Bytes::from_static(data),
                content_type: content_type.to_string(),
            },
        );
    }

    // ---- inspection ---------------------------------------------------

    /// Current rows of a table
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// A stored object, if present
    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// Paths stored in a bucket, sorted
    pub fn object_paths(&self, bucket: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Emails handed to the mailer
    pub fn sent_emails(&self) -> Vec<Email> {
        self.lock().sent.clone()
    }

    /// Current password of an account
    pub fn password_for(&self, email: &str) -> Option<String> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.email == email)
            .map(|a| a.password.clone())
    }

    /// The full call log in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of logged calls starting with `prefix` (`""` counts all)
    pub fn call_count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Position of the first logged call equal to `call`
    pub fn call_position(&self, call: &str) -> Option<usize> {
        self.lock().calls.iter().position(|c| c == call)
    }

    // ---- failure injection --------------------------------------------

    /// Make every storage removal fail
    pub fn fail_storage_remove(&self) {
        self.lock().faults.storage_remove = true;
    }

    /// Make every storage upload fail
    pub fn fail_storage_upload(&self) {
        self.lock().faults.storage_upload = true;
    }

    /// Make every mail send fail
    pub fn fail_mail(&self) {
        self.lock().faults.mail = true;
    }

    /// Make deletes on `table` fail
    pub fn fail_deletes_on(&self, table: &str) {
        self.lock().faults.failing_deletes.insert(table.to_string());
    }

    /// Make inserts into `table` fail
    pub fn fail_inserts_on(&self, table: &str) {
        self.lock().faults.failing_inserts.insert(table.to_string());
    }

    /// Deny user-token access to `table` the way row-level rules would;
    /// service-role access still succeeds
    pub fn deny_user_access(&self, table: &str) {
        self.lock().faults.denied_tables.insert(table.to_string());
    }

    /// Make the auth service unreachable
    pub fn set_auth_unavailable(&self) {
        self.lock().faults.auth_unavailable = true;
    }

    /// Report a configuration fault from token exchange
    pub fn misconfigure(&self) {
        self.lock().faults.misconfigured = true;
    }

    /// Panic inside token exchange
    pub fn panic_on_get_user(&self) {
        self.lock().faults.panic_on_get_user = true;
    }

    fn check_access(&self, table: &str, access: &Access) -> BackendResult<()> {
        let state = self.lock();
        if let Access::User(token) = access {
            if !state.tokens.contains_key(token) {
                return Err(BackendError::AccessDenied("JWT expired".to_string()));
            }
            if state.faults.denied_tables.contains(table) {
                return Err(BackendError::AccessDenied(format!(
                    "permission denied for table {}",
                    table
                )));
            }
        }
        Ok(())
    }
}

fn with_defaults(mut row: Value) -> Value {
    if let Value::Object(map) = &mut row {
        map.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
        map.entry("created_at").or_insert_with(|| json!(Utc::now()));
    }
    row
}

fn merge(row: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(changes)) = (row, patch) {
        for (k, v) in changes {
            target.insert(k.clone(), v.clone());
        }
    }
}

#[async_trait]
impl AuthProvider for InMemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        self.record("auth.sign_in");
        if self.lock().faults.auth_unavailable {
            return Err(unavailable("auth"));
        }

        let account = self
            .lock()
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .cloned()
            .ok_or(BackendError::InvalidCredentials)?;

        let token = self.issue_token(account.id);
        Ok(AuthSession {
            access_token: token,
            token_type: Some("bearer".to_string()),
            expires_in: Some(3600),
            refresh_token: None,
            user: AuthIdentity {
                id: account.id,
                email: Some(account.email),
                created_at: Some(Utc::now()),
            },
        })
    }

    async fn get_user(&self, access_token: &str) -> BackendResult<AuthIdentity> {
        self.record("auth.get_user");
        let (should_panic, misconfigured, unreachable) = {
            let state = self.lock();
            (
                state.faults.panic_on_get_user,
                state.faults.misconfigured,
                state.faults.auth_unavailable,
            )
        };
        if should_panic {
            panic!("token exchange blew up");
        }
        if misconfigured {
            return Err(BackendError::Configuration(
                "service-role key is not configured".to_string(),
            ));
        }
        if unreachable {
            return Err(unavailable("auth"));
        }

        let state = self.lock();
        let id = *state
            .tokens
            .get(access_token)
            .ok_or(BackendError::Unauthorized)?;
        let account = state
            .accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or(BackendError::Unauthorized)?;
        Ok(AuthIdentity {
            id,
            email: Some(account.email.clone()),
            created_at: None,
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        self.record("auth.sign_out");
        if self.lock().faults.auth_unavailable {
            return Err(unavailable("auth"));
        }
        self.lock().tokens.remove(access_token);
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, new_password: &str) -> BackendResult<()> {
        self.record("auth.update_password");
        let mut state = self.lock();
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.id == user_id)
            .ok_or_else(|| BackendError::NotFound(format!("user {}", user_id)))?;
        account.password = new_password.to_string();
        Ok(())
    }

    async fn health_check(&self) -> BackendResult<bool> {
        self.record("auth.health");
        Ok(!self.lock().faults.auth_unavailable)
    }
}

#[async_trait]
impl Database for InMemoryBackend {
    async fn select(&self, query: &Query, access: &Access) -> BackendResult<Vec<Value>> {
        self.record(format!("db.select:{}", query.table));
        self.check_access(&query.table, access)?;

        let rows: Vec<Value> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| matches_all(row, query))
            .collect();
        Ok(arrange(rows, query))
    }

    async fn insert(&self, table: &str, row: Value, access: &Access) -> BackendResult<Value> {
        self.record(format!("db.insert:{}", table));
        self.check_access(table, access)?;
        if self.lock().faults.failing_inserts.contains(table) {
            return Err(unavailable("database"));
        }
        Ok(self.seed_row(table, row))
    }

    async fn update(
        &self,
        query: &Query,
        patch: Value,
        access: &Access,
    ) -> BackendResult<Vec<Value>> {
        self.record(format!("db.update:{}", query.table));
        self.check_access(&query.table, access)?;

        let mut state = self.lock();
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(&query.table) {
            for row in rows.iter_mut().filter(|row| matches_all(row, query)) {
                merge(row, &patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query, access: &Access) -> BackendResult<Vec<Value>> {
        self.record(format!("db.delete:{}", query.table));
        self.check_access(&query.table, access)?;

        let mut state = self.lock();
        if state.faults.failing_deletes.contains(&query.table) {
            return Err(unavailable("database"));
        }
        let Some(rows) = state.tables.get_mut(&query.table) else {
            return Ok(Vec::new());
        };
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|row| matches_all(row, query));
        *rows = kept;
        Ok(removed)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> BackendResult<()> {
        self.record(format!("storage.upload:{}", bucket));
        let mut state = self.lock();
        if state.faults.storage_upload {
            return Err(unavailable("storage"));
        }
        let key = (bucket.to_string(), path.to_string());
        if state.objects.contains_key(&key) {
            return Err(BackendError::ApiError {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        state.objects.insert(
            key,
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> BackendResult<()> {
        self.record(format!("storage.remove:{}", bucket));
        let mut state = self.lock();
        if state.faults.storage_remove {
            return Err(unavailable("storage"));
        }
        for path in paths {
            state.objects.remove(&(bucket.to_string(), path.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for InMemoryBackend {
    async fn send(&self, email: &Email) -> BackendResult<()> {
        self.record("mail.send");
        let mut state = self.lock();
        if state.faults.mail {
            return Err(unavailable("mail"));
        }
        state.sent.push(email.clone());
        Ok(())
    }
}
