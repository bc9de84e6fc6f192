//! Server Configuration
//!
//! Centralized configuration with sensible defaults. The server binary fills
//! it from command-line flags; tests build it directly.

use crate::storage::{ExpiryConfig, DEFAULT_SAMPLE_SIZE, DEFAULT_SWEEP_INTERVAL};
use std::time::Duration;

/// Main configuration for a SparkKV server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Host to bind to
    pub host: String,

    /// Port to listen on (0 picks a free port)
    pub port: u16,

    /// Cap on buffered, undecoded bytes per connection (None = unbounded)
    pub max_buffer_bytes: Option<usize>,

    // -------------------------------------------------------------------------
    // Expiry Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of expired keys removed by one sweep
    pub sample_size: usize,

    /// Interval between two sweeps
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            max_buffer_bytes: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the sweeper settings
    pub fn expiry_config(&self) -> ExpiryConfig {
        ExpiryConfig {
            interval: self.sweep_interval,
        }
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn max_buffer_bytes(mut self, limit: Option<usize>) -> Self {
        self.config.max_buffer_bytes = limit;
        self
    }

    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.config.sample_size = sample_size;
        self
    }

    /// Values below [`MIN_SWEEP_INTERVAL`](crate::storage::MIN_SWEEP_INTERVAL)
    /// are raised to it when the sweeper starts.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
