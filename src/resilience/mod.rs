mod breaker;
mod events;
mod http;

pub use breaker::{BreakerConfig, BreakerError, BreakerRegistry, BreakerState};
pub use events::{ResilienceEvent, ResilienceEvents};
pub use http::{CallOptions, RequestError, ResilientClient};
