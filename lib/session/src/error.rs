//! Error types for the session crate.
//!
//! A missing, expired, or orphaned session is never an error: validation
//! reports it as `Ok(None)`. The variants here are the infrastructure and
//! provider failures that callers surface as a generic failure response.

use std::fmt;

/// Errors from session and sign-in operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The persistence layer failed.
    Storage { details: String },
    /// The identity provider rejected a request or could not be reached.
    Provider { provider: String, reason: String },
    /// A value that should have been a well-formed token was not.
    InvalidToken { reason: String },
}

impl SessionError {
    /// Shorthand for a storage failure.
    pub fn storage(details: impl fmt::Display) -> Self {
        Self::Storage {
            details: details.to_string(),
        }
    }

    /// Shorthand for a provider failure.
    pub fn provider(provider: &str, reason: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { details } => {
                write!(f, "session storage error: {details}")
            }
            Self::Provider { provider, reason } => {
                write!(f, "identity provider '{provider}' error: {reason}")
            }
            Self::InvalidToken { reason } => {
                write!(f, "invalid token: {reason}")
            }
        }
    }
}

impl std::error::Error for SessionError {}
