//! Client for the hosted backend used by Soundbank
//!
//! The site delegates identity, row storage and file storage to a hosted
//! provider reached over HTTP, and mail delivery to a transactional mail API.
//! This crate wraps those APIs behind four traits so the API server can be
//! tested against in-memory fakes:
//!
//! - [`AuthProvider`] - password sign-in, token exchange, sign-out
//! - [`Database`] - filtered select/insert/update/delete on named tables
//! - [`ObjectStorage`] - upload and remove files in a bucket
//! - [`Mailer`] - send an email
//!
//! [`BackendClient`] implements the first three; [`HttpMailer`] implements
//! the last.
//!
//! # Thread Safety
//!
//! Both clients are `Clone + Send + Sync` and share an HTTP connection pool
//! across clones.
//!
//! # Example
//!
//! ```no_run
//! use soundbank_backend_client::{Access, AuthProvider, BackendClient, Database, Filter, Query};
//! use soundbank_shared_config::BackendConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BackendClient::new(&BackendConfig::default())?;
//!
//! let session = client.sign_in_with_password("admin@example.com", "secret").await?;
//! let rows = client
//!     .select(
//!         &Query::table("users").filter(Filter::eq("id", session.user.id)),
//!         &Access::User(session.access_token.clone()),
//!     )
//!     .await?;
//! println!("{} row(s)", rows.len());
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod database;
mod error;
mod mailer;
mod models;
mod storage;

pub use auth::AuthProvider;
pub use client::BackendClient;
pub use database::{Database, Filter, Order, Query};
pub use error::{BackendError, BackendResult};
pub use mailer::{HttpMailer, Mailer};
pub use models::{Access, AuthIdentity, AuthSession, Email};
pub use storage::ObjectStorage;
