//! HTTP router.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login/google", get(auth::login_google))
        .route("/login/google/callback", get(auth::callback_google))
        .route("/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::refresh_session_cookie,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
