//! Session lifecycle: issue, validate with sliding renewal, invalidate.
//!
//! `current_session` is the request-path entry point. It validates through a
//! [`TaggedCache`] keyed by session ID, so a page that asks for the session
//! several times costs one store round trip. Invalidation evicts the cache as
//! well as deleting rows.

use chrono::{DateTime, Utc};
use pushbox_core::UserId;
use rootcause::prelude::Report;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::auth::AuthenticatedUser;
use crate::cache::{Cached, TaggedCache};
use crate::error::SessionError;
use crate::session::{Session, SessionId};
use crate::store::SessionStore;
use crate::token::SessionToken;

/// Default lifetime of a cached "no session" result.
pub const DEFAULT_NEGATIVE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Lifetime of a cached session that is already inside its renewal window.
const RENEWAL_RECHECK_TTL: Duration = Duration::from_secs(60);

/// How long a validated session may be served from cache: until it enters
/// its renewal window, so the next lookup there reaches validation and
/// renews it. Never longer than the session itself lives.
fn positive_ttl(session: &Session, now: DateTime<Utc>) -> Duration {
    let until_renewal = session.until_renewal_at(now).to_std().unwrap_or_default();
    if !until_renewal.is_zero() {
        return until_renewal;
    }
    let remaining = session.remaining_at(now).to_std().unwrap_or_default();
    remaining.min(RENEWAL_RECHECK_TTL)
}

fn user_tag(user_id: UserId) -> String {
    format!("user:{user_id}")
}

/// Issues and validates sessions against a [`SessionStore`].
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    cache: TaggedCache<Option<AuthenticatedUser>>,
    negative_ttl: Duration,
}

impl SessionManager {
    /// Creates a manager with default cache settings.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            cache: TaggedCache::new(None),
            negative_ttl: DEFAULT_NEGATIVE_CACHE_TTL,
        }
    }

    /// Sets how long "no session" results are cached and an optional cap on
    /// the lifetime of positive results.
    #[must_use]
    pub fn with_cache_settings(mut self, negative_ttl: Duration, max_ttl: Option<Duration>) -> Self {
        self.negative_ttl = negative_ttl;
        self.cache = TaggedCache::new(max_ttl);
        self
    }

    /// Persists a new session for `token`, expiring 30 days from now.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn create_session(
        &self,
        token: &SessionToken,
        user_id: UserId,
    ) -> Result<Session, Report<SessionError>> {
        self.create_session_at(token, user_id, Utc::now()).await
    }

    /// [`create_session`](Self::create_session) at an explicit time.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn create_session_at(
        &self,
        token: &SessionToken,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Session, Report<SessionError>> {
        let session = Session::issue(token, user_id, now);
        self.store.insert_session(&session).await?;
        // A "no session" result may have been cached for this token.
        self.cache.invalidate(session.id().as_str()).await;
        info!(session_id = %session.id(), "session created");
        Ok(session)
    }

    /// Looks up the session for `token`, deleting it if expired and renewing
    /// it if it is inside the renewal window.
    ///
    /// # Errors
    ///
    /// Propagates storage failures. An unknown or expired token is `Ok(None)`.
    pub async fn validate_session_token(
        &self,
        token: &SessionToken,
    ) -> Result<Option<AuthenticatedUser>, Report<SessionError>> {
        self.validate_session_token_at(token, Utc::now()).await
    }

    /// [`validate_session_token`](Self::validate_session_token) at an
    /// explicit time.
    pub async fn validate_session_token_at(
        &self,
        token: &SessionToken,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthenticatedUser>, Report<SessionError>> {
        let id = SessionId::from_token(token);
        let Some(found) = self.store.find_session_and_user(&id).await? else {
            debug!(session_id = %id, "no session for token");
            return Ok(None);
        };

        let (mut session, user) = found.into_parts();
        if session.is_expired_at(now) {
            self.store.delete_session(&id).await?;
            debug!(session_id = %id, "deleted expired session");
            return Ok(None);
        }

        if session.needs_renewal_at(now) {
            session.renew(now);
            self.store
                .update_session_expiry(&id, session.expires_at())
                .await?;
            debug!(
                session_id = %id,
                expires_at = %session.expires_at(),
                "renewed session"
            );
        }

        Ok(Some(AuthenticatedUser::new(session, user)))
    }

    /// Validates `token` through the cache.
    ///
    /// Positive results stay cached until the session reaches its renewal
    /// window (never past its expiry) and negative ones for the configured
    /// negative lifetime. A missing token is
    /// `Ok(None)` without touching the store.
    ///
    /// # Errors
    ///
    /// Propagates storage failures; failures are not cached.
    pub async fn current_session(
        &self,
        token: Option<&SessionToken>,
    ) -> Result<Option<AuthenticatedUser>, Report<SessionError>> {
        self.current_session_at(token, Utc::now()).await
    }

    /// [`current_session`](Self::current_session) at an explicit time.
    pub async fn current_session_at(
        &self,
        token: Option<&SessionToken>,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthenticatedUser>, Report<SessionError>> {
        let Some(token) = token else {
            return Ok(None);
        };
        let key = SessionId::from_token(token);

        self.cache
            .get_or_try_insert_with(key.as_str(), || async move {
                let validated = self.validate_session_token_at(token, now).await?;
                let cached = match &validated {
                    Some(auth) => {
                        let ttl = positive_ttl(auth.session(), now);
                        Cached::new(validated.clone(), ttl).tagged(user_tag(auth.user_id()))
                    }
                    None => Cached::new(None, self.negative_ttl),
                };
                Ok::<_, Report<SessionError>>(cached)
            })
            .await
    }

    /// Deletes one session.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn invalidate_session(
        &self,
        session_id: &SessionId,
    ) -> Result<(), Report<SessionError>> {
        self.store.delete_session(session_id).await?;
        self.cache.invalidate(session_id.as_str()).await;
        info!("session invalidated");
        Ok(())
    }

    /// Deletes every session of a user.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn invalidate_all_sessions(
        &self,
        user_id: UserId,
    ) -> Result<(), Report<SessionError>> {
        self.store.delete_user_sessions(user_id).await?;
        let evicted = self.cache.invalidate_tag(&user_tag(user_id)).await;
        info!(evicted, "all sessions invalidated for user");
        Ok(())
    }

    /// Removes expired sessions from the store and expired cache entries.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn delete_expired(&self) -> Result<u64, Report<SessionError>> {
        let deleted = self.store.delete_expired_sessions(Utc::now()).await?;
        let purged = self.cache.purge_expired().await;
        debug!(deleted, purged, "expired sessions cleaned up");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::UserStore;
    use crate::token::generate_session_token;
    use crate::user::User;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    async fn setup() -> (Arc<MemoryStore>, SessionManager, User) {
        let store = Arc::new(MemoryStore::new());
        let user = User::new("g-alice".to_string(), "Alice".to_string());
        store.insert_user(&user).await.expect("insert user");
        let manager = SessionManager::new(store.clone());
        (store, manager, user)
    }

    #[tokio::test]
    async fn validate_after_create_returns_session_and_user() {
        let (_, manager, user) = setup().await;
        let token = generate_session_token();

        let created = manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");
        let validated = manager
            .validate_session_token_at(&token, t0())
            .await
            .expect("validate")
            .expect("session");

        assert_eq!(validated.session(), &created);
        assert_eq!(validated.user(), &user);
        assert_eq!(created.expires_at(), t0() + ChronoDuration::days(30));
    }

    #[tokio::test]
    async fn stored_key_is_hash_not_token() {
        let (store, manager, user) = setup().await;
        let token = generate_session_token();
        let session = manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");

        assert_ne!(session.id().as_str(), token.as_str());
        assert!(store.session(session.id()).await.is_some());
        assert!(
            store
                .session(&SessionId::new(token.as_str().to_string()))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn unknown_token_is_none() {
        let (_, manager, _) = setup().await;
        let result = manager
            .validate_session_token_at(&generate_session_token(), t0())
            .await
            .expect("validate");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn expired_session_is_deleted() {
        let (store, manager, user) = setup().await;
        let token = generate_session_token();
        let session = manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");

        let result = manager
            .validate_session_token_at(&token, t0() + ChronoDuration::days(30))
            .await
            .expect("validate");
        assert!(result.is_none());
        assert!(store.session(session.id()).await.is_none());
    }

    #[tokio::test]
    async fn outside_renewal_window_is_unchanged() {
        let (store, manager, user) = setup().await;
        let token = generate_session_token();
        let session = manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");

        let validated = manager
            .validate_session_token_at(&token, t0() + ChronoDuration::days(10))
            .await
            .expect("validate")
            .expect("session");

        assert_eq!(validated.session().expires_at(), session.expires_at());
        assert_eq!(
            store.session(session.id()).await.map(|s| s.expires_at()),
            Some(session.expires_at())
        );
    }

    #[tokio::test]
    async fn sliding_renewal_timeline() {
        let (store, manager, user) = setup().await;
        let token = generate_session_token();
        let session = manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");

        let renewed = manager
            .validate_session_token_at(&token, t0() + ChronoDuration::days(20))
            .await
            .expect("validate")
            .expect("session");
        assert_eq!(renewed.session().expires_at(), t0() + ChronoDuration::days(50));
        assert_eq!(
            store.session(session.id()).await.map(|s| s.expires_at()),
            Some(t0() + ChronoDuration::days(50))
        );

        let gone = manager
            .validate_session_token_at(&token, t0() + ChronoDuration::days(51))
            .await
            .expect("validate");
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn session_of_deleted_user_is_none() {
        let (store, manager, user) = setup().await;
        let token = generate_session_token();
        manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");
        store.remove_user(user.id()).await;

        let result = manager
            .validate_session_token_at(&token, t0())
            .await
            .expect("validate");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn invalidate_all_sessions_spares_other_users() {
        let (store, manager, alice) = setup().await;
        let bob = User::new("g-bob".to_string(), "Bob".to_string());
        store.insert_user(&bob).await.expect("insert user");

        let alice_tokens = [generate_session_token(), generate_session_token()];
        for token in &alice_tokens {
            manager
                .create_session_at(token, alice.id(), t0())
                .await
                .expect("create");
        }
        let bob_token = generate_session_token();
        manager
            .create_session_at(&bob_token, bob.id(), t0())
            .await
            .expect("create");

        manager
            .invalidate_all_sessions(alice.id())
            .await
            .expect("invalidate");

        for token in &alice_tokens {
            assert!(
                manager
                    .validate_session_token_at(token, t0())
                    .await
                    .expect("validate")
                    .is_none()
            );
        }
        assert!(
            manager
                .validate_session_token_at(&bob_token, t0())
                .await
                .expect("validate")
                .is_some()
        );
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn invalidate_session_is_idempotent() {
        let (store, manager, user) = setup().await;
        let token = generate_session_token();
        let session = manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");

        manager
            .invalidate_session(session.id())
            .await
            .expect("invalidate");
        manager
            .invalidate_session(session.id())
            .await
            .expect("invalidate again");
        assert_eq!(store.session_count().await, 0);
    }

    /// Counts lookups so tests can observe cache hits.
    struct CountingStore {
        inner: Arc<MemoryStore>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl SessionStore for CountingStore {
        async fn insert_session(&self, session: &Session) -> Result<(), Report<SessionError>> {
            self.inner.insert_session(session).await
        }

        async fn find_session_and_user(
            &self,
            id: &SessionId,
        ) -> Result<Option<AuthenticatedUser>, Report<SessionError>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_session_and_user(id).await
        }

        async fn update_session_expiry(
            &self,
            id: &SessionId,
            expires_at: DateTime<Utc>,
        ) -> Result<(), Report<SessionError>> {
            self.inner.update_session_expiry(id, expires_at).await
        }

        async fn delete_session(&self, id: &SessionId) -> Result<(), Report<SessionError>> {
            self.inner.delete_session(id).await
        }

        async fn delete_user_sessions(
            &self,
            user_id: UserId,
        ) -> Result<(), Report<SessionError>> {
            self.inner.delete_user_sessions(user_id).await
        }

        async fn delete_expired_sessions(
            &self,
            now: DateTime<Utc>,
        ) -> Result<u64, Report<SessionError>> {
            self.inner.delete_expired_sessions(now).await
        }
    }

    async fn counting_setup() -> (Arc<CountingStore>, SessionManager, User) {
        let memory = Arc::new(MemoryStore::new());
        let user = User::new("g-carol".to_string(), "Carol".to_string());
        memory.insert_user(&user).await.expect("insert user");
        let store = Arc::new(CountingStore {
            inner: memory,
            lookups: AtomicUsize::new(0),
        });
        let manager = SessionManager::new(store.clone());
        (store, manager, user)
    }

    #[tokio::test]
    async fn current_session_without_token_skips_store() {
        let (store, manager, _) = counting_setup().await;
        assert!(manager.current_session(None).await.expect("ok").is_none());
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn current_session_is_cached() {
        let (store, manager, user) = counting_setup().await;
        let token = generate_session_token();
        manager
            .create_session(&token, user.id())
            .await
            .expect("create");

        for _ in 0..3 {
            let current = manager
                .current_session(Some(&token))
                .await
                .expect("current")
                .expect("session");
            assert_eq!(current.user_id(), user.id());
        }
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn negative_result_is_cached_until_session_created() {
        let (store, manager, user) = counting_setup().await;
        let token = generate_session_token();

        for _ in 0..2 {
            assert!(
                manager
                    .current_session(Some(&token))
                    .await
                    .expect("current")
                    .is_none()
            );
        }
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);

        manager
            .create_session(&token, user.id())
            .await
            .expect("create");
        assert!(
            manager
                .current_session(Some(&token))
                .await
                .expect("current")
                .is_some()
        );
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_evicts_cached_session() {
        let (_, manager, user) = counting_setup().await;
        let token = generate_session_token();
        let session = manager
            .create_session(&token, user.id())
            .await
            .expect("create");
        assert!(
            manager
                .current_session(Some(&token))
                .await
                .expect("current")
                .is_some()
        );

        manager
            .invalidate_session(session.id())
            .await
            .expect("invalidate");
        assert!(
            manager
                .current_session(Some(&token))
                .await
                .expect("current")
                .is_none()
        );
    }

    #[tokio::test]
    async fn invalidate_all_evicts_cached_sessions() {
        let (_, manager, user) = counting_setup().await;
        let token = generate_session_token();
        manager
            .create_session(&token, user.id())
            .await
            .expect("create");
        assert!(
            manager
                .current_session(Some(&token))
                .await
                .expect("current")
                .is_some()
        );

        manager
            .invalidate_all_sessions(user.id())
            .await
            .expect("invalidate");
        assert!(
            manager
                .current_session(Some(&token))
                .await
                .expect("current")
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cached_session_is_revalidated_at_renewal_window() {
        let (store, manager, user) = counting_setup().await;
        let token = generate_session_token();
        let session = manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");

        // Cached on day 1 until the window opens on day 15.
        manager
            .current_session_at(Some(&token), t0() + ChronoDuration::days(1))
            .await
            .expect("current")
            .expect("session");
        tokio::time::advance(Duration::from_secs(13 * 86_400)).await;
        manager
            .current_session_at(Some(&token), t0() + ChronoDuration::days(14))
            .await
            .expect("current")
            .expect("session");
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(6 * 86_400)).await;
        let renewed = manager
            .current_session_at(Some(&token), t0() + ChronoDuration::days(20))
            .await
            .expect("current")
            .expect("session");
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(renewed.session().expires_at(), t0() + ChronoDuration::days(50));
        assert_eq!(
            store.inner.session(session.id()).await.map(|s| s.expires_at()),
            Some(t0() + ChronoDuration::days(50))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cached_session_expires_exactly_at_its_ttl() {
        let (store, manager, user) = counting_setup().await;
        let token = generate_session_token();
        manager
            .create_session_at(&token, user.id(), t0())
            .await
            .expect("create");
        let lookup = || manager.current_session_at(Some(&token), t0());

        lookup().await.expect("current").expect("session");
        tokio::time::advance(Duration::from_secs(15 * 86_400 - 1)).await;
        lookup().await.expect("current").expect("session");
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        lookup().await.expect("current").expect("session");
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn positive_ttl_never_outlives_session() {
        let user_id = UserId::new();
        let token = generate_session_token();

        let fresh = Session::issue(&token, user_id, t0());
        assert_eq!(
            positive_ttl(&fresh, t0()),
            Duration::from_secs(15 * 86_400)
        );

        let nearly_gone = Session::from_parts(
            SessionId::from_token(&token),
            user_id,
            t0() + ChronoDuration::seconds(30),
        );
        assert_eq!(positive_ttl(&nearly_gone, t0()), Duration::from_secs(30));

        let in_window = Session::from_parts(
            SessionId::from_token(&token),
            user_id,
            t0() + ChronoDuration::days(10),
        );
        assert_eq!(positive_ttl(&in_window, t0()), RENEWAL_RECHECK_TTL);
    }
}
