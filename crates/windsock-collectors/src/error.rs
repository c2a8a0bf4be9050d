//! Error types for weather collectors.

use thiserror::Error;

/// Errors that can occur when collecting from a weather provider.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The provider answered with an unexpected status code.
    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Every station or endpoint of a source failed.
    #[error("no data collected from {0}")]
    NoData(String),
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CollectorError::Timeout
        } else if err.is_connect() {
            CollectorError::Connection(err.to_string())
        } else if err.is_decode() {
            CollectorError::Decode(err.to_string())
        } else {
            CollectorError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_names_endpoint() {
        let err = CollectorError::Status {
            endpoint: "https://api.holfuy.com/live/".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 503 from https://api.holfuy.com/live/"
        );
    }
}
