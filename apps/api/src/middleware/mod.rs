//! Middleware components for Soundbank API
//!
//! Session handling:
//! - `resolve_session`: resolves the `sb-token` cookie on every request
//! - `MaybeAuthUser`, `AdminUser`: extractors over the resolved session
//!
//! Rate limiting:
//! - `rate_limit`: per-route fixed-window limit for one action category
//! - `RateLimitState::enforce`: the same check from inside a handler

pub mod auth;
pub mod rate_limit;
pub mod session;

pub use auth::{AdminUser, AuthRejection, MaybeAuthUser};
pub use rate_limit::{
    extract_client_ip, get_key, rate_limit, ActionCategory, ClientIdentity, Clock,
    FixedWindowRateLimiter, ManualClock, RateLimitDecision, RateLimitPolicies, RateLimitPolicy,
    RateLimitState, SystemClock,
};
pub use session::{resolve_session, CookieSettings, CurrentUser, SESSION_COOKIE};
