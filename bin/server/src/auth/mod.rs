//! Authentication for the pushbox server.
//!
//! This module provides:
//! - Google sign-in (`/login/google` and its callback)
//! - Session cookies backed by [`SessionManager`]
//! - Axum extractors that resolve the current session
//! - Postgres implementations of the session and user stores

pub mod cookies;
pub mod db;
pub mod google;
pub mod middleware;
pub mod routes;

use crate::config::SessionConfig;
use pushbox_session::{IdentityProvider, SessionManager, UserStore};
use std::sync::Arc;

pub use google::GoogleClient;
pub use middleware::{OptionalAuth, RequireAuth};
pub use routes::{callback_google, login_google, logout, me};

/// Shared application state.
pub struct AppState {
    /// Session lifecycle and lookup cache.
    pub sessions: SessionManager,
    /// User persistence for sign-in.
    pub users: Arc<dyn UserStore>,
    /// Identity provider used for sign-in.
    pub provider: Arc<dyn IdentityProvider>,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        sessions: SessionManager,
        users: Arc<dyn UserStore>,
        provider: Arc<dyn IdentityProvider>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            users,
            provider,
            session_config,
        }
    }

    /// Whether cookies carry the Secure flag.
    pub fn secure_cookies(&self) -> bool {
        self.session_config.secure_cookies
    }
}
