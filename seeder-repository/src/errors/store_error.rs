//! Record store error types.

use thiserror::Error;

/// Errors from a single record store operation.
///
/// None of these abort a seeding run on their own: the seeder records the
/// failed record and moves on.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A record operation was attempted before `authenticate` succeeded.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// The store answered with a non-success status.
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request did not complete within the client timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection or protocol failure below HTTP.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store answered successfully but the body was not understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The store client could not be built from its configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create an unauthenticated error for the named operation.
    pub fn unauthenticated(operation: impl Into<String>) -> Self {
        Self::Unauthenticated(operation.into())
    }

    /// Create a rejection error.
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status of a rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors from authenticating against the record store.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The store refused the credentials.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The store accepted the login but returned no token.
    #[error("Authentication response did not contain a token")]
    MissingToken,

    /// The login request itself failed.
    #[error("Authentication request failed: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Create an invalid credentials error.
    pub fn invalid_credentials(msg: impl Into<String>) -> Self {
        Self::InvalidCredentials(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display() {
        let err = StoreError::rejected(400, r#"{"message":"Failed to create record."}"#);
        assert_eq!(
            err.to_string(),
            r#"Request rejected with status 400: {"message":"Failed to create record."}"#
        );
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_status_only_for_rejections() {
        assert_eq!(StoreError::Timeout("slow".to_string()).status(), None);
    }

    #[test]
    fn test_auth_error_wraps_store_error() {
        let err: AuthError = StoreError::Transport("connection refused".to_string()).into();
        assert!(matches!(err, AuthError::Store(StoreError::Transport(_))));
        assert_eq!(
            err.to_string(),
            "Authentication request failed: Transport error: connection refused"
        );
    }
}
