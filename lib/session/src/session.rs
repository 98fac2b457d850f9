//! Sessions with a sliding expiry window.
//!
//! A session lives for [`SESSION_LIFETIME_DAYS`] from creation. Validating it
//! within [`RENEWAL_WINDOW_DAYS`] of its expiry pushes the expiry back out to a
//! full lifetime from the moment of validation. Renewal never happens
//! anywhere except during validation.

use chrono::{DateTime, Duration, Utc};
use pushbox_core::UserId;
use serde::{Deserialize, Serialize};

use crate::token::SessionToken;

/// Days a session stays valid after creation or renewal.
pub const SESSION_LIFETIME_DAYS: i64 = 30;

/// Days before expiry inside which validation renews a session.
pub const RENEWAL_WINDOW_DAYS: i64 = 15;

fn session_lifetime() -> Duration {
    Duration::days(SESSION_LIFETIME_DAYS)
}

/// Storage key of a session: the hex SHA-256 digest of its token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an already-derived session identifier (e.g. a database key).
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Derives the session identifier for a token.
    #[must_use]
    pub fn from_token(token: &SessionToken) -> Self {
        Self(token.digest_hex())
    }

    /// Returns the session ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session for `token` that expires a full lifetime after `now`.
    #[must_use]
    pub fn issue(token: &SessionToken, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::from_token(token),
            user_id,
            expires_at: now + session_lifetime(),
        }
    }

    /// Reconstitutes a session from storage.
    #[must_use]
    pub fn from_parts(id: SessionId, user_id: UserId, expires_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            expires_at,
        }
    }

    /// Returns the session ID.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the owning user's ID.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns when the session expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns true if validating at `now` should extend the session.
    #[must_use]
    pub fn needs_renewal_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::days(RENEWAL_WINDOW_DAYS)
    }

    /// Extends the expiry to a full lifetime after `now`.
    pub fn renew(&mut self, now: DateTime<Utc>) {
        self.expires_at = now + session_lifetime();
    }

    /// Time until the session enters its renewal window, or zero once inside.
    #[must_use]
    pub fn until_renewal_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - Duration::days(RENEWAL_WINDOW_DAYS) - now).max(Duration::zero())
    }

    /// Time left before expiry at `now`, or zero once expired.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn issued() -> Session {
        Session::issue(&SessionToken::from("token"), UserId::new(), t0())
    }

    #[test]
    fn session_id_is_token_digest() {
        let token = SessionToken::from("token");
        let id = SessionId::from_token(&token);
        assert_eq!(id.as_str(), token.digest_hex());
        assert_eq!(id.as_str().len(), 64);
        assert_ne!(id.as_str(), token.as_str());
    }

    #[test]
    fn issue_sets_thirty_day_expiry() {
        let session = issued();
        assert_eq!(session.expires_at(), t0() + Duration::days(30));
    }

    #[test]
    fn expiry_is_inclusive() {
        let session = issued();
        assert!(!session.is_expired_at(session.expires_at() - Duration::seconds(1)));
        assert!(session.is_expired_at(session.expires_at()));
    }

    #[test]
    fn renewal_window_starts_fifteen_days_before_expiry() {
        let session = issued();
        assert!(!session.needs_renewal_at(t0() + Duration::days(14)));
        assert!(session.needs_renewal_at(t0() + Duration::days(15)));
        assert!(session.needs_renewal_at(t0() + Duration::days(20)));
    }

    #[test]
    fn renew_extends_from_now() {
        let mut session = issued();
        let now = t0() + Duration::days(20);
        session.renew(now);
        assert_eq!(session.expires_at(), t0() + Duration::days(50));
    }

    #[test]
    fn remaining_never_negative() {
        let session = issued();
        assert_eq!(session.remaining_at(t0()), Duration::days(30));
        assert_eq!(
            session.remaining_at(t0() + Duration::days(31)),
            Duration::zero()
        );
    }

    #[test]
    fn until_renewal_counts_down_to_window() {
        let session = issued();
        assert_eq!(session.until_renewal_at(t0()), Duration::days(15));
        assert_eq!(
            session.until_renewal_at(t0() + Duration::days(14)),
            Duration::days(1)
        );
        assert_eq!(
            session.until_renewal_at(t0() + Duration::days(20)),
            Duration::zero()
        );
    }

    #[test]
    fn session_serialization_roundtrip() {
        let session = issued();
        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(session, parsed);
    }
}
