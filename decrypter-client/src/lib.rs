//! Decrypter HTTP Client
//!
//! A small, type-safe client for the remote cipher solver service, plus the
//! poller that watches a submitted task until it settles.
//!
//! # Example
//!
//! ```no_run
//! use decrypter_client::{SolverApi, SolverClient};
//!
//! #[tokio::main]
//! async fn main() -> decrypter_client::Result<()> {
//!     let client = SolverClient::new("http://localhost:8000");
//!
//!     let job = client.submit("KHOOR ZRUOG", Some(42)).await?;
//!     let snapshot = client.fetch_status(&job).await?;
//!
//!     println!("Task {} is {}", job, snapshot.status);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod poller;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
mod tasks;

// Re-export commonly used types
pub use decrypter_core::domain::task::Job;
pub use decrypter_core::dto::task::TaskSnapshot;
pub use error::{ClientError, Result};
pub use poller::{PollEvent, Poller};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Operations offered by the solver service
///
/// [`SolverClient`] talks HTTP; tests substitute a scripted implementation.
#[async_trait]
pub trait SolverApi: Send + Sync {
    /// Submit a ciphertext and get back the handle of the new task
    async fn submit(&self, cipher_text: &str, seed: Option<i64>) -> Result<Job>;

    /// Fetch the cumulative state of a task
    async fn fetch_status(&self, job: &Job) -> Result<TaskSnapshot>;
}

/// Rejects input the service must never see
pub fn validate_cipher_text(cipher_text: &str) -> Result<()> {
    if cipher_text.is_empty() {
        return Err(ClientError::Validation(
            "cipher text must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// HTTP client for the solver service
#[derive(Debug, Clone)]
pub struct SolverClient {
    /// Base URL of the service (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl SolverClient {
    /// Create a new solver client
    ///
    /// # Example
    /// ```
    /// use decrypter_client::SolverClient;
    ///
    /// let client = SolverClient::new("http://localhost:8000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new solver client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use decrypter_client::SolverClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = SolverClient::with_client("http://localhost:8000", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
