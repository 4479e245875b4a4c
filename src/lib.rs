//! Seawall - the request-handling core of a JSON HTTP API server
//!
//! Seawall wraps every registered route with a fixed middleware pipeline:
//! panic isolation, request timing/logging, deadline enforcement, and
//! per-client GCRA rate limiting, plus a uniform JSON envelope for every
//! success (`{"data": ...}`) and error (`{"errors": [...]}`) response.
//!
//! It is not a web framework: business handlers, configuration loading, and
//! deployment glue live in the embedding application, which talks to this
//! crate through [`Config`], [`Server`], and the envelope types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use seawall::{Config, Data, Server};
//! use serde_json::json;
//!
//! async fn hello() -> Data<serde_json::Value> {
//!     Data::new(json!({"message": "Hello!"}))
//! }
//!
//! #[tokio::main]
//! async fn main() -> seawall::Result<()> {
//!     seawall::init_tracing();
//!
//!     Server::new(Config::default())?
//!         .get("/hello", hello)
//!         .serve()
//!         .await
//! }
//! ```
//!
//! # Client identity
//!
//! Rate limiting and logs key on a per-client identity resolved from
//! `X-Forwarded-For` / `X-Real-Ip` headers, falling back to the socket
//! address. The first forwarded-for entry is trusted as-is: behind an
//! untrusted proxy it can be forged, which keeps compatibility with the
//! usual reverse-proxy deployment at the cost of spoofability.

pub mod client_ip;
mod config;
mod context;
mod error;
pub mod ratelimit;
mod recover;
pub mod request_logging;
mod response;
mod server;
pub mod testing;
pub mod timeout;

// Re-exports for public API
pub use client_ip::resolve_client_ip;
pub use config::{Config, ConfigBuilder, ServerConfig};
pub use context::RequestContext;
pub use error::{ApiError, ErrorEnvelope, Result, SeawallError};
pub use ratelimit::{ClientRateLimiter, RateLimitConfig, RateLimitConfigBuilder};
pub use response::{Data, not_implemented};
pub use server::Server;
pub use timeout::{TimeoutConfig, TimeoutConfigBuilder};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call this early, typically in `main()` before constructing the server.
///
/// # Environment Variables
///
/// - `RUST_LOG`: set log level (e.g., "info", "seawall=debug")
/// - `SEAWALL_LOG_JSON`: set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("SEAWALL_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
