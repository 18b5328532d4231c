//! Error types for calls against the Glean API.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single API call, after retries.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The request did not complete within the client timeout.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Connection-level failure (DNS, refused, reset...).
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success status.
    ///
    /// `message` is the server's `detail` when it sent one, otherwise a
    /// generic description of the status.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        detail: Option<String>,
    },

    /// Body could not be decoded into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Request could not be built (bad base URL, header value...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_displays_its_message() {
        let err = ApiError::Status {
            status: 404,
            message: "Book not found".to_string(),
            detail: Some("Book not found".to_string()),
        };
        assert_eq!(err.to_string(), "Book not found");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn transport_errors_carry_no_status() {
        let err = ApiError::Timeout(Duration::from_secs(30));
        assert_eq!(err.status(), None);
        assert_eq!(err.detail(), None);
        assert_eq!(err.to_string(), "request timed out after 30s");
    }
}
