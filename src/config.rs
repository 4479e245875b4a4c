use crate::error::{Result, SeawallError};
use crate::ratelimit::RateLimitConfig;
use crate::timeout::TimeoutConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration consumed by a Seawall server.
///
/// The core only consumes this record; loading it from files or the
/// environment belongs to the embedding application.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub timeout: TimeoutConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            timeout: TimeoutConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|e| {
            SeawallError::invalid_config(format!(
                "invalid listen address {}:{} - {}",
                self.host, self.port, e
            ))
        })
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Builder for Config with validation at build time
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: TimeoutConfig) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting would prevent the server from
    /// starting: an unparseable listen address, a zero port, a zero timeout,
    /// or a non-positive rate-limit quota or capacity.
    pub fn build(self) -> Result<Config> {
        if self.config.server.port == 0 {
            return Err(SeawallError::invalid_config(
                "server port must be greater than 0",
            ));
        }

        self.config.server.addr()?;

        if self.config.timeout.timeout_seconds == 0 {
            return Err(SeawallError::invalid_config(
                "request timeout must be greater than 0",
            ));
        }

        if self.config.rate_limit.per_minute == 0 {
            return Err(SeawallError::invalid_config(
                "rate limit per_minute must be greater than 0",
            ));
        }

        if self.config.rate_limit.burst == 0 {
            return Err(SeawallError::invalid_config(
                "rate limit burst must be greater than 0",
            ));
        }

        if self.config.rate_limit.max_clients == 0 {
            return Err(SeawallError::invalid_config(
                "rate limit max_clients must be greater than 0",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.timeout.timeout_seconds, 30);
    }

    #[test]
    fn test_zero_port_rejected() {
        let result = ConfigBuilder::new().with_port(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_host_rejected() {
        let result = ConfigBuilder::new().with_host("not a host").build();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("invalid listen address")
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ConfigBuilder::new()
            .with_timeout(TimeoutConfig::builder().timeout_seconds(0).build())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_rate_limit_fields_rejected() {
        let result = ConfigBuilder::new()
            .with_rate_limit(RateLimitConfig::builder().per_minute(0).build())
            .build();
        assert!(result.is_err());

        let result = ConfigBuilder::new()
            .with_rate_limit(RateLimitConfig::builder().burst(0).build())
            .build();
        assert!(result.is_err());

        let result = ConfigBuilder::new()
            .with_rate_limit(RateLimitConfig::builder().max_clients(0).build())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_addr_parses_host_and_port() {
        let config = ConfigBuilder::new()
            .with_host("127.0.0.1")
            .with_port(9000)
            .build()
            .unwrap();
        assert_eq!(config.server.addr().unwrap().to_string(), "127.0.0.1:9000");
    }
}
