//! Business logic services for Soundbank
//!
//! This module contains the logic behind the route handlers:
//! - Authentication, password reset and session verification
//! - Session resolution for the request middleware
//! - Sound library uploads and ordered deletes
//! - Survey sign-ups and the contact form
//! - Health checks

pub mod auth;
pub mod contact;
pub mod health;
pub mod session;
pub mod sounds;
pub mod survey;

pub use auth::{AuthConfig, AuthService};
pub use contact::{ContactMessage, ContactService};
pub use health::HealthService;
pub use session::{SessionResolution, SessionResolver, UnresolvedReason};
pub use sounds::{AudioFormat, SoundService, SoundUpload};
pub use survey::SurveyService;
