//! Error types for the dashboard client.
//!
//! Every failure here is recoverable: callers log it, degrade the affected
//! widget, and keep polling.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// Transport failure (connection refused, reset, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend reported an error inside an otherwise valid payload
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid agent URL '{url}': {reason}")]
    InvalidAgentUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DashboardError::Status { status: 502, body: "bad gateway".into() };
        assert_eq!(err.to_string(), "Backend returned 502: bad gateway");
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<i32>("not json").unwrap_err();
        let err: DashboardError = json_err.into();
        assert!(matches!(err, DashboardError::Json(_)));
    }
}
