//! Per-client rate limiting.
//!
//! GCRA admission keyed by the resolved client identity, with an immutable
//! quota and a bounded store of tracked clients.

mod config;
mod layer;

pub use config::{RateLimitConfig, RateLimitConfigBuilder};
pub use layer::{ClientRateLimiter, RateLimitLayer, RateLimitService};
