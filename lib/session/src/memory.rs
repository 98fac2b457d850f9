//! In-process store for tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pushbox_core::UserId;
use rootcause::prelude::Report;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::auth::AuthenticatedUser;
use crate::error::SessionError;
use crate::session::{Session, SessionId};
use crate::store::{SessionStore, UserStore};
use crate::user::User;

#[derive(Default)]
struct Tables {
    sessions: HashMap<SessionId, Session>,
    users: HashMap<UserId, User>,
}

/// Sessions and users held in memory behind a single lock.
///
/// Lookups join sessions to users the same way the SQL store does: a
/// session whose user is missing is reported as absent.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored session by ID without the user join.
    pub async fn session(&self, id: &SessionId) -> Option<Session> {
        self.tables.read().await.sessions.get(id).cloned()
    }

    /// Returns how many sessions are stored.
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    /// Removes a user record, leaving its sessions in place.
    pub async fn remove_user(&self, user_id: UserId) {
        self.tables.write().await.users.remove(&user_id);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &Session) -> Result<(), Report<SessionError>> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(session.id()) {
            return Err(SessionError::storage(format!(
                "duplicate session id '{}'",
                session.id()
            ))
            .into());
        }
        tables
            .sessions
            .insert(session.id().clone(), session.clone());
        Ok(())
    }

    async fn find_session_and_user(
        &self,
        id: &SessionId,
    ) -> Result<Option<AuthenticatedUser>, Report<SessionError>> {
        let tables = self.tables.read().await;
        let joined = tables.sessions.get(id).and_then(|session| {
            tables
                .users
                .get(&session.user_id())
                .map(|user| AuthenticatedUser::new(session.clone(), user.clone()))
        });
        Ok(joined)
    }

    async fn update_session_expiry(
        &self,
        id: &SessionId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Report<SessionError>> {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.sessions.get_mut(id) {
            *session = Session::from_parts(session.id().clone(), session.user_id(), expires_at);
        }
        Ok(())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), Report<SessionError>> {
        self.tables.write().await.sessions.remove(id);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<(), Report<SessionError>> {
        self.tables
            .write()
            .await
            .sessions
            .retain(|_, session| session.user_id() != user_id);
        Ok(())
    }

    async fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Report<SessionError>> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|_, session| !session.is_expired_at(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, Report<SessionError>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.google_id() == google_id)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), Report<SessionError>> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|existing| existing.google_id() == user.google_id())
        {
            return Err(SessionError::storage(format!(
                "duplicate google id '{}'",
                user.google_id()
            ))
            .into());
        }
        tables.users.insert(user.id(), user.clone());
        Ok(())
    }
}
