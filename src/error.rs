// Error handling module
// Defines the client error taxonomy surfaced to callers

use serde_json::Value;
use thiserror::Error;

use crate::models::ApiEnvelope;

/// Errors returned by the e-service client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or transport failure (unreachable host, timeout, broken body)
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("API error {status}: {}", .envelope.summary())]
    Api {
        status: u16,
        envelope: ApiEnvelope<Value>,
    },

    /// Authentication could not be recovered and local session state was cleared
    #[error("Session expired: {message}")]
    SessionExpired { message: String, redirected: bool },

    /// Server answered 2xx with `success: false`
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session store could not be read or written
    #[error("Session store error: {0}")]
    Session(#[from] anyhow::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Request could not be built from the given arguments
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cached user lacks the capability the operation needs
    #[error("Not permitted: {0}")]
    NotPermitted(String),
}

impl ClientError {
    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::SessionExpired { .. } => Some(401),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Decoded error envelope for server-side failures
    pub fn envelope(&self) -> Option<&ApiEnvelope<Value>> {
        match self {
            ClientError::Api { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(message: Option<&str>, error: Option<&str>) -> ApiEnvelope<Value> {
        ApiEnvelope {
            success: false,
            data: None,
            message: message.map(str::to_string),
            error: error.map(str::to_string),
            pagination: None,
        }
    }

    #[test]
    fn test_api_error_message_prefers_message() {
        let err = ClientError::Api {
            status: 422,
            envelope: envelope(Some("Invalid capacity"), Some("VALIDATION")),
        };
        assert_eq!(err.to_string(), "API error 422: Invalid capacity");
    }

    #[test]
    fn test_api_error_message_falls_back_to_error() {
        let err = ClientError::Api {
            status: 500,
            envelope: envelope(None, Some("boom")),
        };
        assert_eq!(err.to_string(), "API error 500: boom");
    }

    #[test]
    fn test_session_expired_message() {
        let err = ClientError::SessionExpired {
            message: "Token expired".to_string(),
            redirected: true,
        };
        assert_eq!(err.to_string(), "Session expired: Token expired");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_status_accessor() {
        let err = ClientError::Api {
            status: 404,
            envelope: envelope(Some("Not found"), None),
        };
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_unauthorized());
        assert!(err.envelope().is_some());

        let err = ClientError::Rejected("nope".to_string());
        assert_eq!(err.status(), None);
        assert!(err.envelope().is_none());
    }

    #[test]
    fn test_session_error_from_anyhow() {
        let err: ClientError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "Session store error: disk full");
    }
}
