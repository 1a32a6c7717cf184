//! Fixed-window rate limiting for Soundbank API
//!
//! Requests are counted per `(client identity, action category)` in
//! discrete windows. The first request of a window opens it; every further
//! request inside the window increments the counter and is allowed while the
//! counter stays within the category's limit. Once the window has elapsed
//! the next request opens a fresh one.
//!
//! State lives in process memory behind one async mutex, so limits are per
//! instance. Time comes from an injected [`Clock`], which lets tests move
//! across window boundaries without sleeping.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, IntoResponseParts, Response, ResponseParts},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::auth::parse_duration_string;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
pub use axum::http::header::RETRY_AFTER;

/// How often stale entries are swept from the map
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ========== Clock ==========

/// Source of time for the limiter
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since the Unix epoch; never goes backwards
    fn now_millis(&self) -> u64;
}

/// Wall-clock anchored monotonic clock
///
/// Reads the system time once and advances with [`Instant`] afterwards, so
/// wall-clock adjustments cannot move a window backwards.
#[derive(Debug)]
pub struct SystemClock {
    anchor_millis: u64,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let anchor_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            anchor_millis,
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.anchor_millis + self.anchor.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Start at the given Unix time in milliseconds
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ========== Categories and policies ==========

/// Class of endpoint sharing one rate-limit policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    Login,
    PasswordReset,
    Delete,
    Contact,
    Api,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 5] = [
        ActionCategory::Login,
        ActionCategory::PasswordReset,
        ActionCategory::Delete,
        ActionCategory::Contact,
        ActionCategory::Api,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::PasswordReset => "PASSWORD_RESET",
            Self::Delete => "DELETE",
            Self::Contact => "CONTACT",
            Self::Api => "API",
        }
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limit and window for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum number of requests allowed in the window
    pub limit: u32,
    /// Window length
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

impl FromStr for RateLimitPolicy {
    type Err = String;

    /// Parse `<limit>/<duration>`, e.g. `5/15m` or `100/1m`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (limit, window) = s
            .split_once('/')
            .ok_or_else(|| format!("expected <limit>/<duration>, got '{}'", s))?;
        let limit: u32 = limit
            .trim()
            .parse()
            .map_err(|_| format!("invalid limit '{}'", limit.trim()))?;
        if limit == 0 {
            return Err("limit must be at least 1".to_string());
        }
        let secs = parse_duration_string(window)
            .filter(|secs| *secs > 0)
            .ok_or_else(|| format!("invalid window '{}'", window.trim()))?;
        Ok(Self::new(limit, Duration::from_secs(secs as u64)))
    }
}

/// One policy per category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicies {
    pub login: RateLimitPolicy,
    pub password_reset: RateLimitPolicy,
    pub delete: RateLimitPolicy,
    pub contact: RateLimitPolicy,
    pub api: RateLimitPolicy,
}

impl Default for RateLimitPolicies {
    fn default() -> Self {
        Self {
            login: RateLimitPolicy::new(5, Duration::from_secs(15 * 60)),
            password_reset: RateLimitPolicy::new(3, Duration::from_secs(60 * 60)),
            delete: RateLimitPolicy::new(20, Duration::from_secs(60)),
            contact: RateLimitPolicy::new(5, Duration::from_secs(60 * 60)),
            api: RateLimitPolicy::new(100, Duration::from_secs(60)),
        }
    }
}

impl RateLimitPolicies {
    pub fn get(&self, category: ActionCategory) -> RateLimitPolicy {
        match category {
            ActionCategory::Login => self.login,
            ActionCategory::PasswordReset => self.password_reset,
            ActionCategory::Delete => self.delete,
            ActionCategory::Contact => self.contact,
            ActionCategory::Api => self.api,
        }
    }

    pub fn set(&mut self, category: ActionCategory, policy: RateLimitPolicy) {
        let slot = match category {
            ActionCategory::Login => &mut self.login,
            ActionCategory::PasswordReset => &mut self.password_reset,
            ActionCategory::Delete => &mut self.delete,
            ActionCategory::Contact => &mut self.contact,
            ActionCategory::Api => &mut self.api,
        };
        *slot = policy;
    }
}

// ========== Limiter ==========

/// Counter for one key
#[derive(Debug, Clone, PartialEq, Eq)]
struct RateLimitEntry {
    count: u32,
    /// Unix milliseconds
    window_start: u64,
    limit: u32,
    window_ms: u64,
}

impl RateLimitEntry {
    fn open(now: u64, policy: RateLimitPolicy) -> Self {
        Self {
            count: 0,
            window_start: now,
            limit: policy.limit,
            window_ms: policy.window.as_millis() as u64,
        }
    }

    fn reset_at(&self) -> u64 {
        self.window_start.saturating_add(self.window_ms)
    }

    fn is_elapsed(&self, now: u64) -> bool {
        now >= self.reset_at()
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix milliseconds at which the current window ends
    pub reset_at_millis: u64,
    /// Whole seconds until the window ends, at least 1
    pub retry_after_secs: u64,
}

impl RateLimitResult {
    /// Window end as Unix seconds, rounded up
    pub fn reset_at_secs(&self) -> u64 {
        self.reset_at_millis.div_ceil(1000)
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    entries: HashMap<String, RateLimitEntry>,
    last_sweep: u64,
}

/// In-memory fixed-window rate limiter
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    state: Mutex<LimiterState>,
    clock: Arc<dyn Clock>,
    sweep_interval_ms: u64,
}

impl FixedWindowRateLimiter {
    /// Create a limiter reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let last_sweep = clock.now_millis();
        Self {
            state: Mutex::new(LimiterState {
                entries: HashMap::new(),
                last_sweep,
            }),
            clock,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
        }
    }

    /// Count one request against `key`
    pub async fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitResult {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().await;

        if now.saturating_sub(state.last_sweep) >= self.sweep_interval_ms {
            let removed = sweep(&mut state.entries, now);
            state.last_sweep = now;
            if removed > 0 {
                debug!(
                    removed = removed,
                    remaining = state.entries.len(),
                    "Swept expired rate limit entries"
                );
            }
        }

        let entry = state
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::open(now, policy));
        if entry.is_elapsed(now) {
            *entry = RateLimitEntry::open(now, policy);
        }
        entry.count = entry.count.saturating_add(1);

        let reset_at_millis = entry.reset_at();
        RateLimitResult {
            success: entry.count <= entry.limit,
            limit: entry.limit,
            remaining: entry.limit.saturating_sub(entry.count),
            reset_at_millis,
            retry_after_secs: reset_at_millis.saturating_sub(now).div_ceil(1000).max(1),
        }
    }

    /// Drop every entry whose window has ended; returns how many were removed
    pub async fn prune_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().await;
        state.last_sweep = now;
        sweep(&mut state.entries, now)
    }

    /// Number of tracked keys
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sweep(entries: &mut HashMap<String, RateLimitEntry>, now: u64) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_elapsed(now));
    before - entries.len()
}

/// Limiter key for a client and action
pub fn get_key(client_identity: &str, category: ActionCategory) -> String {
    format!("{}:{}", client_identity, category.as_str())
}

/// Identify the client: first `X-Forwarded-For` entry, then the peer
/// address, then `"unknown"`
pub fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip) = value.split(',').next() {
                let ip = ip.trim();
                if ip.parse::<IpAddr>().is_ok() {
                    return ip.to_string();
                }
            }
        }
    }

    if let Some(connect_info) = connect_info {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

/// Client identity used for rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let connect_info = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        Ok(ClientIdentity(extract_client_ip(&parts.headers, connect_info)))
    }
}

// ========== Axum integration ==========

/// Limiter plus policies, shared by handlers and middleware
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub limiter: Arc<FixedWindowRateLimiter>,
    pub policies: Arc<RateLimitPolicies>,
}

impl RateLimitState {
    pub fn new(policies: RateLimitPolicies, clock: Arc<dyn Clock>) -> Self {
        Self {
            limiter: Arc::new(FixedWindowRateLimiter::new(clock)),
            policies: Arc::new(policies),
        }
    }

    /// Count a request and reject it once the category's limit is spent
    pub async fn enforce(
        &self,
        category: ActionCategory,
        client_identity: &str,
    ) -> ApiResult<RateLimitDecision> {
        let key = get_key(client_identity, category);
        let result = self.limiter.check(&key, self.policies.get(category)).await;

        if result.success {
            debug!(key = %key, remaining = result.remaining, "Rate limit check passed");
            Ok(RateLimitDecision(result))
        } else {
            warn!(
                client = %client_identity,
                category = %category,
                retry_after = result.retry_after_secs,
                "Rate limit exceeded"
            );
            Err(ApiError::RateLimited {
                limit: result.limit,
                reset_at: result.reset_at_secs(),
                retry_after: result.retry_after_secs,
            })
        }
    }
}

/// Accepted check; adds the `X-RateLimit-*` headers to a response
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision(pub RateLimitResult);

impl IntoResponseParts for RateLimitDecision {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let headers = res.headers_mut();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.0.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.0.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.0.reset_at_secs()));
        Ok(res)
    }
}

/// Middleware applying one category's limit to every request of a route
///
/// ```rust,ignore
/// .route_layer(middleware::from_fn_with_state(
///     (rate_limits.clone(), ActionCategory::Delete),
///     rate_limit,
/// ))
/// ```
pub async fn rate_limit(
    State((state, category)): State<(RateLimitState, ActionCategory)>,
    ClientIdentity(client): ClientIdentity,
    request: Request,
    next: Next,
) -> Response {
    match state.enforce(category, &client).await {
        Ok(decision) => (decision, next.run(request).await).into_response(),
        Err(e) => e.into_response(),
    }
}
