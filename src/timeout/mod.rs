//! Request timeout enforcement.

mod config;
mod layer;

pub use config::{TimeoutConfig, TimeoutConfigBuilder};
pub use layer::{TimeoutLayer, TimeoutService};
