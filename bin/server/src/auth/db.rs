//! Postgres-backed session and user stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pushbox_core::UserId;
use pushbox_session::{
    AuthenticatedUser, Session, SessionError, SessionId, SessionStore, User, UserStore,
};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

fn parse_user_id(raw: &str) -> Result<UserId, Report<SessionError>> {
    UserId::from_str(raw)
        .map_err(|e| SessionError::storage(format!("invalid user id '{raw}': {e}")).into())
}

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    google_id: String,
    name: String,
    picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, Report<SessionError>> {
        Ok(User::with_all_fields(
            parse_user_id(&self.id)?,
            self.google_id,
            self.name,
            self.picture,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Row type for the session/user join.
#[derive(FromRow)]
struct SessionUserRow {
    session_id: String,
    expires_at: DateTime<Utc>,
    user_id: String,
    google_id: String,
    name: String,
    picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionUserRow {
    fn try_into_authenticated(self) -> Result<AuthenticatedUser, Report<SessionError>> {
        let user_id = parse_user_id(&self.user_id)?;
        let session = Session::from_parts(SessionId::new(self.session_id), user_id, self.expires_at);
        let user = User::with_all_fields(
            user_id,
            self.google_id,
            self.name,
            self.picture,
            self.created_at,
            self.updated_at,
        );
        Ok(AuthenticatedUser::new(session, user))
    }
}

/// Session storage in the `sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert_session(&self, session: &Session) -> Result<(), Report<SessionError>> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(session.id().as_str())
        .bind(session.user_id().to_string())
        .bind(session.expires_at())
        .execute(&self.pool)
        .await
        .map_err(SessionError::storage)?;
        Ok(())
    }

    async fn find_session_and_user(
        &self,
        id: &SessionId,
    ) -> Result<Option<AuthenticatedUser>, Report<SessionError>> {
        let row: Option<SessionUserRow> = sqlx::query_as(
            r#"
            SELECT s.id AS session_id, s.expires_at,
                   u.id AS user_id, u.google_id, u.name, u.picture, u.created_at, u.updated_at
            FROM sessions s
            INNER JOIN users u ON u.id = s.user_id
            WHERE s.id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(SessionError::storage)?;

        row.map(SessionUserRow::try_into_authenticated).transpose()
    }

    async fn update_session_expiry(
        &self,
        id: &SessionId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Report<SessionError>> {
        sqlx::query("UPDATE sessions SET expires_at = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(SessionError::storage)?;
        Ok(())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), Report<SessionError>> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(SessionError::storage)?;
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<(), Report<SessionError>> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(SessionError::storage)?;
        Ok(())
    }

    async fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Report<SessionError>> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(SessionError::storage)?;
        Ok(result.rows_affected())
    }
}

/// User storage in the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, Report<SessionError>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, google_id, name, picture, created_at, updated_at
            FROM users
            WHERE google_id = $1
            "#,
        )
        .bind(google_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SessionError::storage)?;

        row.map(UserRow::try_into_user).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<(), Report<SessionError>> {
        sqlx::query(
            r#"
            INSERT INTO users (id, google_id, name, picture, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id().to_string())
        .bind(user.google_id())
        .bind(user.name())
        .bind(user.picture())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(SessionError::storage)?;
        Ok(())
    }
}
