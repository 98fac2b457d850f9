//! HTTP-facing error types.
//!
//! Handlers return [`AuthError`]; its `IntoResponse` impl decides the status
//! code and keeps infrastructure detail out of response bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pushbox_session::SessionError;
use rootcause::prelude::Report;
use std::fmt;

/// Errors surfaced by the sign-in and session routes.
#[derive(Debug)]
pub enum AuthError {
    /// A required query parameter or cookie was absent.
    MissingParameter { name: &'static str },
    /// The `state` returned by the provider did not match the cookie.
    StateMismatch,
    /// The provider rejected the authorization code or profile request.
    Provider { details: String },
    /// No valid session accompanied the request.
    NotAuthenticated,
    /// Storage or another internal dependency failed.
    Internal { details: String },
}

impl AuthError {
    /// Wraps an infrastructure failure.
    pub fn internal(report: &Report<SessionError>) -> Self {
        Self::Internal {
            details: format!("{report:?}"),
        }
    }

    /// Wraps a failure reported by the named identity provider.
    pub fn provider(provider: &str, report: &Report<SessionError>) -> Self {
        Self::Provider {
            details: format!("{provider}: {report:?}"),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter { .. } | Self::StateMismatch | Self::Provider { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameter { name } => write!(f, "missing '{name}'"),
            Self::StateMismatch => write!(f, "OAuth state mismatch"),
            Self::Provider { details } => write!(f, "identity provider error: {details}"),
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::Internal { details } => write!(f, "internal error: {details}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::MissingParameter { name } => format!("Missing {name}"),
            Self::StateMismatch => "Invalid OAuth state".to_string(),
            Self::Provider { details } => {
                tracing::warn!(error = %details, "identity provider rejected sign-in");
                "Sign-in failed".to_string()
            }
            Self::NotAuthenticated => "Not authenticated".to_string(),
            Self::Internal { details } => {
                tracing::error!(error = %details, "request failed");
                "Internal server error".to_string()
            }
        };
        (status, body).into_response()
    }
}

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    Config { details: String },
    Database { details: String },
    Bind { addr: String, details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::Database { details } => write!(f, "database error: {details}"),
            Self::Bind { addr, details } => write!(f, "failed to serve on {addr}: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            AuthError::MissingParameter { name: "code" }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::StateMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Internal {
                details: "db down".to_string()
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn provider_error_names_provider() {
        let report: Report<SessionError> = SessionError::provider("google", "invalid_grant").into();
        let err = AuthError::provider("google", &report);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("identity provider error: google: "));
    }

    #[test]
    fn storage_report_maps_to_500() {
        let report: Report<SessionError> = SessionError::storage("connection refused").into();
        let response = AuthError::internal(&report).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
