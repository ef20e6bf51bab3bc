// src/error.rs
//! Typed failures of the jobs API collaborator.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Client errors (4xx) are never retried, everything else is.
    pub fn should_retry(&self) -> bool {
        !self.is_client_error()
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Http { status, .. } if (400..=499).contains(status))
    }

    /// Text shown to the user, without the variant prefix.
    pub fn user_message(&self) -> Option<&str> {
        let message = match self {
            Self::Transport(message) => message.as_str(),
            Self::Timeout => "Request timed out",
            Self::Http { message, .. } => message.as_str(),
            Self::InvalidResponse(message) => message.as_str(),
        };

        let message = message.trim();
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_not_retried() {
        let not_found = ApiError::Http {
            status: 404,
            message: "Job not found".to_string(),
        };
        assert!(not_found.is_client_error());
        assert!(!not_found.should_retry());
    }

    #[test]
    fn test_server_and_transport_errors_are_retried() {
        let unavailable = ApiError::Http {
            status: 503,
            message: "upstream unavailable".to_string(),
        };
        assert!(unavailable.should_retry());
        assert!(ApiError::Timeout.should_retry());
        assert!(ApiError::InvalidResponse("missing data".to_string()).should_retry());
    }

    #[test]
    fn test_retry_ignores_digits_in_message() {
        // A message mentioning "4" says nothing about the status class.
        let e = ApiError::Transport("connection reset after 4 attempts".to_string());
        assert!(e.should_retry());
    }

    #[test]
    fn test_user_message() {
        let e = ApiError::Transport("network down".to_string());
        assert_eq!(e.user_message(), Some("network down"));
        assert_eq!(e.to_string(), "network error: network down");

        let blank = ApiError::Http {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(blank.user_message(), None);
    }
}
