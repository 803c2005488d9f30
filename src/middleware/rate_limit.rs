use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::Clock;
use governor::middleware::StateInformationMiddleware;
use governor::{DefaultKeyedRateLimiter, Quota};
use thiserror::Error;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

/// Request classes with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Public,
    Authenticated,
    Upload,
}

impl RouteClass {
    pub fn of(method: &Method, path: &str) -> Self {
        if path.starts_with("/api/images") {
            RouteClass::Upload
        } else if method == Method::GET || method == Method::HEAD {
            RouteClass::Public
        } else {
            RouteClass::Authenticated
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Public => "public",
            RouteClass::Authenticated => "authenticated",
            RouteClass::Upload => "upload",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("{0} rate limit must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("rate limit window must be greater than zero")]
    ZeroWindow,
}

/// Outcome of counting one request against a client's budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

/// Counter backend. Swappable for a shared store when running more than one
/// instance.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn hit(&self, class: RouteClass, client: &str) -> RateLimitStatus;

    /// Drop state for clients whose budget is fully replenished.
    async fn prune(&self) {}
}

/// GCRA budget for one route class: `limit` requests as a burst, refilled
/// evenly over the window.
struct ClassLimiter {
    limiter: DefaultKeyedRateLimiter<String, StateInformationMiddleware>,
    limit: u32,
    replenish: Duration,
}

impl ClassLimiter {
    fn new(class: RouteClass, limit: u32, window: Duration) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(limit).ok_or(RateLimitError::ZeroLimit(class.as_str()))?;
        let replenish = window / limit;
        let quota = Quota::with_period(replenish)
            .ok_or(RateLimitError::ZeroWindow)?
            .allow_burst(burst);
        let limiter =
            governor::RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>();
        Ok(Self { limiter, limit, replenish })
    }

    fn hit(&self, client: &str) -> RateLimitStatus {
        match self.limiter.check_key(&client.to_string()) {
            Ok(state) => {
                let remaining = state.remaining_burst_capacity();
                RateLimitStatus {
                    allowed: true,
                    limit: self.limit,
                    remaining,
                    reset_after: self.replenish * self.limit.saturating_sub(remaining),
                }
            }
            Err(not_until) => RateLimitStatus {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_after: not_until.wait_time_from(self.limiter.clock().now()),
            },
        }
    }

    fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}

/// Per-client budgets kept in process memory, one keyed limiter per class.
pub struct MemoryRateLimitStore {
    public: ClassLimiter,
    authenticated: ClassLimiter,
    upload: ClassLimiter,
}

impl MemoryRateLimitStore {
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        Self::with_window(config, Duration::from_secs(config.window_secs))
    }

    pub fn with_window(config: &RateLimitConfig, window: Duration) -> Result<Self, RateLimitError> {
        Ok(Self {
            public: ClassLimiter::new(RouteClass::Public, config.public_requests, window)?,
            authenticated: ClassLimiter::new(RouteClass::Authenticated, config.authenticated_requests, window)?,
            upload: ClassLimiter::new(RouteClass::Upload, config.upload_requests, window)?,
        })
    }

    /// Number of clients currently tracked across all classes.
    pub fn tracked_clients(&self) -> usize {
        self.public.limiter.len() + self.authenticated.limiter.len() + self.upload.limiter.len()
    }

    fn class(&self, class: RouteClass) -> &ClassLimiter {
        match class {
            RouteClass::Public => &self.public,
            RouteClass::Authenticated => &self.authenticated,
            RouteClass::Upload => &self.upload,
        }
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, class: RouteClass, client: &str) -> RateLimitStatus {
        self.class(class).hit(client)
    }

    async fn prune(&self) {
        self.public.prune();
        self.authenticated.prune();
        self.upload.prune();
    }
}

/// Rate limiter shared by the middleware.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn in_memory(config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let store = MemoryRateLimitStore::new(&config)?;
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    pub async fn check(&self, client: &str, class: RouteClass) -> RateLimitStatus {
        self.store.hit(class, client).await
    }

    pub async fn prune(&self) {
        self.store.prune().await
    }
}

/// Client address as reported by the edge proxy.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("cf-connecting-ip")
        .or_else(|| header("x-real-ip"))
        .or_else(|| header("x-forwarded-for").and_then(|v| v.split(',').next()).map(str::trim))
        .unwrap_or("unknown")
        .to_string()
}

pub async fn rate_limit_middleware(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    if !limiter.enabled() {
        return next.run(req).await;
    }

    let class = RouteClass::of(req.method(), req.uri().path());
    let client = client_ip(req.headers());
    let status = limiter.check(&client, class).await;

    if !status.allowed {
        tracing::warn!(client = %client, class = class.as_str(), "Rate limit exceeded");
        let retry_after = status.reset_after.as_secs().max(1);
        let mut response =
            ApiError::too_many_requests("too many requests, try again later", retry_after).into_response();
        insert_headers(response.headers_mut(), &status);
        return response;
    }

    let mut response = next.run(req).await;
    insert_headers(response.headers_mut(), &status);
    response
}

fn insert_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(status.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(status.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(status.reset_after.as_secs()));
}
