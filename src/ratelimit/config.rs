use serde::{Deserialize, Serialize};

/// Rate limiting configuration.
///
/// The quota is immutable once the server is constructed: `per_minute`
/// tokens refill continuously, capped at `burst`, and each admitted request
/// consumes one. `max_clients` bounds how many distinct client identities
/// the limiter tracks at once.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests refilled per minute, per client
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    /// Maximum tokens a client can accumulate (spike allowance)
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Maximum number of distinct tracked client identities
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            burst: default_burst(),
            max_clients: default_max_clients(),
        }
    }
}

impl RateLimitConfig {
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::new()
    }
}

/// Builder for RateLimitConfig
#[must_use = "builder does nothing until you call build()"]
pub struct RateLimitConfigBuilder {
    config: RateLimitConfig,
}

impl RateLimitConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RateLimitConfig::default(),
        }
    }

    pub fn per_minute(mut self, per_minute: u32) -> Self {
        self.config.per_minute = per_minute;
        self
    }

    pub fn burst(mut self, burst: u32) -> Self {
        self.config.burst = burst;
        self
    }

    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.config.max_clients = max_clients;
        self
    }

    pub fn build(self) -> RateLimitConfig {
        self.config
    }
}

impl Default for RateLimitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_per_minute() -> u32 {
    60
}

fn default_burst() -> u32 {
    5
}

fn default_max_clients() -> usize {
    65536
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.per_minute, 60);
        assert_eq!(config.burst, 5);
        assert_eq!(config.max_clients, 65536);
    }

    #[test]
    fn test_builder() {
        let config = RateLimitConfig::builder()
            .per_minute(120)
            .burst(10)
            .max_clients(1024)
            .build();

        assert_eq!(config.per_minute, 120);
        assert_eq!(config.burst, 10);
        assert_eq!(config.max_clients, 1024);
    }
}
