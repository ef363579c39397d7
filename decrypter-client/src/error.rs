//! Error types for the solver client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the solver service
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any network call
    #[error("Invalid request: {0}")]
    Validation(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Request did not complete in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The service does not know the task
    #[error("Task not found: {0}")]
    NotFound(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// True only for the service's explicit unknown-task reply
    ///
    /// A bare HTTP 404 stays an [`ClientError::ApiError`] and counts as a
    /// transport failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Failures of the network exchange itself, as opposed to rejected input
    /// or a task the service has forgotten
    pub fn is_transport(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::Timeout(_)
            | Self::ParseError(_)
            | Self::ApiError { .. } => true,
            Self::Validation(_) | Self::NotFound(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ClientError::api_error(503, "unavailable").is_transport());
        assert!(ClientError::Timeout(Duration::from_secs(1)).is_transport());
        assert!(!ClientError::Validation("empty".into()).is_transport());

        let missing = ClientError::NotFound("t1".into());
        assert!(missing.is_not_found());
        assert!(!missing.is_transport());

        let http_404 = ClientError::api_error(404, "gone");
        assert!(!http_404.is_not_found());
        assert!(http_404.is_transport());
    }

    #[test]
    fn test_error_messages() {
        let err = ClientError::api_error(500, "boom");
        assert_eq!(err.to_string(), "API error (status 500): boom");
    }
}
