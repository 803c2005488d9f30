pub mod rate_limit;
pub mod response;

pub use rate_limit::{
    rate_limit_middleware, MemoryRateLimitStore, RateLimitError, RateLimitStore, RateLimiter, RouteClass,
};
pub use response::{ApiResponse, ApiResult};
