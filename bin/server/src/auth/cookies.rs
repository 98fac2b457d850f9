//! Cookie builders for the session and the transient sign-in values.
//!
//! Every cookie is HTTP-only, same-site lax, scoped to `/`, and marked
//! secure when the deployment serves HTTPS.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use pushbox_session::SessionToken;
use pushbox_session::oauth::{CODE_VERIFIER_COOKIE, STATE_COOKIE, TRANSIENT_COOKIE_MINUTES};
use time::{Duration as TimeDuration, OffsetDateTime};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

fn base(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Adds the session cookie, expiring with the session.
pub fn set_session_cookie(
    jar: CookieJar,
    token: &SessionToken,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> CookieJar {
    let mut cookie = base(SESSION_COOKIE, token.as_str().to_string(), secure);
    if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
        cookie.set_expires(expires);
    }
    jar.add(cookie)
}

/// Replaces the session cookie with an empty one that expires immediately.
pub fn delete_session_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired(SESSION_COOKIE, secure))
}

/// Adds the OAuth `state` and PKCE verifier cookies.
pub fn set_login_cookies(
    jar: CookieJar,
    state: &str,
    code_verifier: &str,
    secure: bool,
) -> CookieJar {
    let lifetime = TimeDuration::minutes(TRANSIENT_COOKIE_MINUTES);
    let mut state_cookie = base(STATE_COOKIE, state.to_string(), secure);
    state_cookie.set_max_age(lifetime);
    let mut verifier_cookie = base(CODE_VERIFIER_COOKIE, code_verifier.to_string(), secure);
    verifier_cookie.set_max_age(lifetime);
    jar.add(state_cookie).add(verifier_cookie)
}

/// Clears both sign-in cookies.
pub fn clear_login_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired(STATE_COOKIE, secure))
        .add(expired(CODE_VERIFIER_COOKIE, secure))
}

fn expired(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = base(name, String::new(), secure);
    cookie.set_max_age(TimeDuration::ZERO);
    cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
    cookie
}
