//! Seed data and a ready-to-use application for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use serde_json::json;
use soundbank_api::config::AppSettings;
use soundbank_api::middleware::{ManualClock, RateLimitPolicies, RateLimitState};
use soundbank_api::{api_router, AppContext};
use soundbank_test_utils::InMemoryBackend;
use tower::ServiceExt;
use uuid::Uuid;

pub const BUCKET: &str = "sounds";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const CLIENT_EMAIL: &str = "client@example.com";
pub const PASSWORD: &str = "password123";
pub const CONTACT_RECIPIENT: &str = "studio@example.com";

/// Upload limit used by the test app
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024;

/// Start of the manual clock (2023-11-14T22:13:20Z)
pub const CLOCK_START_MILLIS: u64 = 1_700_000_000_000;

/// The API router wired to an in-memory backend and a hand-driven clock
pub struct TestApp {
    pub backend: InMemoryBackend,
    pub clock: Arc<ManualClock>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(test_settings(), RateLimitPolicies::default())
    }

    pub fn with_policies(policies: RateLimitPolicies) -> Self {
        Self::build(test_settings(), policies)
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        Self::build(settings, RateLimitPolicies::default())
    }

    fn build(settings: AppSettings, policies: RateLimitPolicies) -> Self {
        let backend = InMemoryBackend::new();
        let clock = Arc::new(ManualClock::new(CLOCK_START_MILLIS));
        let ctx = AppContext {
            auth: Arc::new(backend.clone()),
            database: Arc::new(backend.clone()),
            storage: Arc::new(backend.clone()),
            mailer: Arc::new(backend.clone()),
            rate_limits: RateLimitState::new(policies, clock.clone()),
            settings,
        };

        Self {
            backend,
            clock,
            router: api_router(ctx),
        }
    }

    /// Send one request through the full router
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Admin account plus a live session token
    pub fn admin_token(&self) -> String {
        let id = self.backend.add_user(ADMIN_EMAIL, PASSWORD, "admin");
        self.backend.issue_token(id)
    }

    /// Client account plus a live session token
    pub fn client_token(&self) -> String {
        let id = self.backend.add_user(CLIENT_EMAIL, PASSWORD, "client");
        self.backend.issue_token(id)
    }

    pub fn seed_profile(&self, name: &str) -> Uuid {
        let row = self.backend.seed_row(
            "sound_profiles",
            json!({
                "name": name,
                "slug": name.to_lowercase().replace(' ', "-"),
                "description": null,
            }),
        );
        row_id(&row)
    }

    /// A `sounds` row with its stored file
    pub fn seed_sound(&self, profile_id: Uuid, path: &'static str) -> Uuid {
        self.backend.put_object(BUCKET, path, b"RIFF....WAVE", "audio/wav");
        let row = self.backend.seed_row(
            "sounds",
            json!({
                "profile_id": profile_id,
                "name": "Door Slam",
                "category": "foley",
                "storage_path": path,
                "mime_type": "audio/wav",
                "size_bytes": 12,
            }),
        );
        row_id(&row)
    }

    pub fn seed_participant(&self, email: &str) -> Uuid {
        let row = self.backend.seed_row(
            "survey_participants",
            json!({
                "name": "Sam",
                "email": email,
                "profile_id": null,
                "notes": null,
            }),
        );
        row_id(&row)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub fn test_settings() -> AppSettings {
    AppSettings {
        upload_max_bytes: TEST_MAX_UPLOAD_BYTES,
        contact_recipient: CONTACT_RECIPIENT.to_string(),
        ..AppSettings::default()
    }
}

pub fn row_id(row: &serde_json::Value) -> Uuid {
    row["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("seeded row has an id")
}
