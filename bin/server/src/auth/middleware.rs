//! Authentication extractors and the sliding session cookie layer.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use pushbox_session::{AuthenticatedUser, SessionToken};
use std::sync::Arc;
use tracing::debug;

use super::{
    AppState,
    cookies::{SESSION_COOKIE, delete_session_cookie, set_session_cookie},
};
use crate::error::AuthError;

/// Reads the session token from the request cookies.
///
/// A malformed value is treated as absent.
pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(SESSION_COOKIE)?;
    match SessionToken::parse(cookie.value()) {
        Ok(token) => Some(token),
        Err(e) => {
            debug!(error = ?e, "ignoring malformed session cookie");
            None
        }
    }
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{SESSION_COOKIE}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

/// Keeps the session cookie in step with the stored session.
///
/// After the handler runs, a request that carried a session cookie gets it
/// reissued with the session's current expiry, which moves forward whenever
/// validation renews the session. A cookie whose session is gone is
/// deleted. Responses that already set the cookie (sign-in, logout) are left
/// alone.
pub async fn refresh_session_cookie(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers());
    let response = next.run(request).await;

    let Some(token) = token else {
        return response;
    };
    if sets_session_cookie(&response) {
        return response;
    }

    let secure = state.secure_cookies();
    match state.sessions.current_session(Some(&token)).await {
        Ok(Some(current)) => {
            let jar = set_session_cookie(
                CookieJar::new(),
                &token,
                current.session().expires_at(),
                secure,
            );
            (jar, response).into_response()
        }
        Ok(None) => (delete_session_cookie(CookieJar::new(), secure), response).into_response(),
        Err(e) => {
            debug!(error = ?e, "session lookup failed; cookie left unchanged");
            response
        }
    }
}

/// Extractor for optionally getting the authenticated user.
///
/// A missing or malformed session cookie yields `None`; only storage
/// failures reject the request.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let token = session_token(&parts.headers);

        let current = app_state
            .sessions
            .current_session(token.as_ref())
            .await
            .map_err(|e| AuthError::internal(&e))?;
        Ok(OptionalAuth(current))
    }
}

/// Extractor for requiring an authenticated user.
///
/// Rejects with 401 when there is no valid session.
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalAuth(current) = OptionalAuth::from_request_parts(parts, state).await?;
        current.map(RequireAuth).ok_or(AuthError::NotAuthenticated)
    }
}
