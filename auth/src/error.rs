//! Error types for authentication operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures of password hashing and bearer token handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Token Errors
    // ═══════════════════════════════════════════════════════════

    /// No bearer token was supplied.
    #[error("Missing credentials")]
    MissingCredentials,

    /// Token is malformed, has a bad signature, or a wrong issuer.
    #[error("Invalid token")]
    InvalidToken,

    /// Token is past its expiry.
    #[error("Token has expired")]
    TokenExpired,

    // ═══════════════════════════════════════════════════════════
    // Infrastructure Errors
    // ═══════════════════════════════════════════════════════════

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Token signing failed.
    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// Check if this error is caused by the client's credentials.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials | Self::InvalidToken | Self::TokenExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_are_user_errors() {
        assert!(AuthError::TokenExpired.is_user_error());
        assert!(AuthError::MissingCredentials.is_user_error());
        assert!(!AuthError::Hashing("oom".into()).is_user_error());
    }
}
