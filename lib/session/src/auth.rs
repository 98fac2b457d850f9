//! The result of a successful session validation.

use pushbox_core::UserId;
use serde::Serialize;

use crate::session::Session;
use crate::user::User;

/// A validated session joined with its owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    session: Session,
    user: User,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user context.
    #[must_use]
    pub fn new(session: Session, user: User) -> Self {
        Self { session, user }
    }

    /// Returns the authenticated user's ID.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.session.user_id()
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the user record.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Splits into session and user.
    #[must_use]
    pub fn into_parts(self) -> (Session, User) {
        (self.session, self.user)
    }
}
