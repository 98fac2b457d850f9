//! Persistence capabilities the session layer depends on.
//!
//! Sessions are keyed by [`SessionId`] and reference users by [`UserId`].
//! Every delete is unconditional and succeeds when nothing matches.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pushbox_core::UserId;
use rootcause::prelude::Report;

use crate::auth::AuthenticatedUser;
use crate::error::SessionError;
use crate::session::{Session, SessionId};
use crate::user::User;

/// Storage for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session.
    async fn insert_session(&self, session: &Session) -> Result<(), Report<SessionError>>;

    /// Looks up a session joined with its user.
    ///
    /// Returns `None` when the session does not exist or its user is gone.
    async fn find_session_and_user(
        &self,
        id: &SessionId,
    ) -> Result<Option<AuthenticatedUser>, Report<SessionError>>;

    /// Overwrites the expiry of a session.
    async fn update_session_expiry(
        &self,
        id: &SessionId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Report<SessionError>>;

    /// Deletes one session.
    async fn delete_session(&self, id: &SessionId) -> Result<(), Report<SessionError>>;

    /// Deletes every session owned by a user.
    async fn delete_user_sessions(&self, user_id: UserId) -> Result<(), Report<SessionError>>;

    /// Deletes sessions that expired at or before `now`, returning how many.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>)
    -> Result<u64, Report<SessionError>>;
}

/// Storage for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds the user linked to a Google account.
    async fn find_user_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, Report<SessionError>>;

    /// Inserts a new user.
    async fn insert_user(&self, user: &User) -> Result<(), Report<SessionError>>;
}
