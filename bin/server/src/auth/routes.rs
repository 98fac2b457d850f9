//! Authentication routes for Google sign-in, logout, and the current user.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use pushbox_session::oauth::{CODE_VERIFIER_COOKIE, STATE_COOKIE};
use pushbox_session::{SessionToken, User, begin_login, generate_session_token, states_match};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    AppState,
    cookies::{clear_login_cookies, delete_session_cookie, set_login_cookies, set_session_cookie},
    middleware::{OptionalAuth, RequireAuth},
};
use crate::error::AuthError;

/// Where the browser lands after signing in or out.
const HOME: &str = "/";

/// Query parameters Google appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Body of `GET /api/me`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
    pub session_expires_at: DateTime<Utc>,
}

/// A 302 response. `Redirect::to` answers 303, which is not what browsers
/// following an OAuth hop expect here.
fn found(jar: CookieJar, location: &str) -> Response {
    (
        StatusCode::FOUND,
        jar,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

/// Starts Google sign-in by redirecting to the account chooser.
pub async fn login_google(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let login = begin_login(state.provider.as_ref());
    let jar = set_login_cookies(
        jar,
        &login.state,
        &login.code_verifier,
        state.secure_cookies(),
    );
    found(jar, &login.authorization_url)
}

/// Completes Google sign-in.
///
/// The transient cookies are cleared on every outcome once read, so each
/// `state` value is usable at most once.
pub async fn callback_google(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    let stored_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let code_verifier = jar.get(CODE_VERIFIER_COOKIE).map(|c| c.value().to_string());
    let jar = clear_login_cookies(jar, state.secure_cookies());

    match sign_in(&state, query, stored_state, code_verifier).await {
        Ok(signed_in) => {
            let jar = set_session_cookie(
                jar,
                &signed_in.token,
                signed_in.expires_at,
                state.secure_cookies(),
            );
            found(jar, HOME)
        }
        Err(e) => (jar, e).into_response(),
    }
}

struct SignedIn {
    token: SessionToken,
    expires_at: DateTime<Utc>,
}

async fn sign_in(
    state: &AppState,
    query: CallbackQuery,
    stored_state: Option<String>,
    code_verifier: Option<String>,
) -> Result<SignedIn, AuthError> {
    if let Some(error) = query.error {
        return Err(AuthError::Provider {
            details: format!("authorization denied: {error}"),
        });
    }
    let code = query.code.ok_or(AuthError::MissingParameter { name: "code" })?;
    let returned_state = query
        .state
        .ok_or(AuthError::MissingParameter { name: "state" })?;
    let stored_state = stored_state.ok_or(AuthError::MissingParameter { name: STATE_COOKIE })?;
    let code_verifier = code_verifier.ok_or(AuthError::MissingParameter {
        name: CODE_VERIFIER_COOKIE,
    })?;

    if !states_match(&stored_state, &returned_state) {
        warn!("OAuth state mismatch on callback");
        return Err(AuthError::StateMismatch);
    }

    let provider = state.provider.as_ref();
    let tokens = provider
        .validate_authorization_code(&code, &code_verifier)
        .await
        .map_err(|e| AuthError::provider(provider.name(), &e))?;
    let profile = provider
        .fetch_profile(&tokens)
        .await
        .map_err(|e| AuthError::provider(provider.name(), &e))?;

    let user = match state
        .users
        .find_user_by_google_id(&profile.subject)
        .await
        .map_err(|e| AuthError::internal(&e))?
    {
        Some(user) => user,
        None => {
            let user = User::new(profile.subject, profile.name.unwrap_or_default())
                .with_picture(profile.picture);
            state
                .users
                .insert_user(&user)
                .await
                .map_err(|e| AuthError::internal(&e))?;
            info!(user_id = %user.id(), "created user from Google profile");
            user
        }
    };

    let token = generate_session_token();
    let session = state
        .sessions
        .create_session(&token, user.id())
        .await
        .map_err(|e| AuthError::internal(&e))?;

    Ok(SignedIn {
        token,
        expires_at: session.expires_at(),
    })
}

/// Ends the current session, if any, and clears the cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    OptionalAuth(current): OptionalAuth,
    jar: CookieJar,
) -> Result<Response, AuthError> {
    if let Some(current) = current {
        state
            .sessions
            .invalidate_session(current.session().id())
            .await
            .map_err(|e| AuthError::internal(&e))?;
    }
    let jar = delete_session_cookie(jar, state.secure_cookies());
    Ok(found(jar, HOME))
}

/// Returns the signed-in user.
pub async fn me(RequireAuth(current): RequireAuth) -> Json<MeResponse> {
    let (session, user) = current.into_parts();
    Json(MeResponse {
        id: user.id().to_string(),
        name: user.name().to_string(),
        picture: user.picture().map(str::to_string),
        session_expires_at: session.expires_at(),
    })
}
