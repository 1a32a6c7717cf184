//! Shared test utilities for the Soundbank workspace
//!
//! This crate provides an in-memory stand-in for the hosted backend so the
//! API can be tested without network dependencies.
//!
//! # Fakes
//!
//! - [`InMemoryBackend`] - implements `AuthProvider`, `Database`,
//!   `ObjectStorage` and `Mailer` over process memory, records every call,
//!   and can inject failures (storage outages, row-level denials, panics)
//!
//! # Example
//!
//! ```rust,ignore
//! use soundbank_test_utils::InMemoryBackend;
//!
//! #[tokio::test]
//! async fn test_with_backend() {
//!     let backend = InMemoryBackend::new();
//!     let admin_id = backend.add_user("admin@example.com", "password123", "admin");
//!     let token = backend.issue_token(admin_id);
//!
//!     // Build the app state from `backend.clone()` and send `sb-token=<token>`
//! }
//! ```

mod backend;
mod filter;

pub use backend::{InMemoryBackend, StoredObject};
