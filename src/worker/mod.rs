mod pool;
mod rate_limit;

pub use pool::{JobHandler, QueueConfig, WorkerPool};
pub use rate_limit::{RateLimit, RateLimiter};
