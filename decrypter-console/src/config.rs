//! Console configuration
//!
//! Where the solver service lives and how the console paces its requests.

use std::time::Duration;

use anyhow::Context;

/// Console configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the solver service (e.g., "http://localhost:8000")
    pub api_base: String,

    /// Period between two status fetches
    pub poll_interval: Duration,

    /// Upper bound for a single HTTP request
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(api_base: String) -> Self {
        Self {
            api_base,
            poll_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_base.is_empty() {
            anyhow::bail!("api_base cannot be empty");
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            anyhow::bail!("api_base must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }

    /// HTTP client honouring the request timeout
    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .context("Failed to build HTTP client")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:8000".to_string())
    }
}
