use pushbox_server::{
    app,
    auth::{
        AppState, GoogleClient,
        db::{PgSessionStore, PgUserStore},
    },
    config::ServerConfig,
    error::StartupError,
};
use pushbox_session::SessionManager;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> pushbox_core::Result<(), StartupError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        details: e.to_string(),
    })?;
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| StartupError::Database {
            details: e.to_string(),
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| StartupError::Database {
            details: e.to_string(),
        })?;

    let google = GoogleClient::new(&config.google).map_err(|e| StartupError::Config {
        details: format!("{e:?}"),
    })?;

    let sessions = SessionManager::new(Arc::new(PgSessionStore::new(db_pool.clone())))
        .with_cache_settings(
            config.session.negative_cache_ttl(),
            config.session.cache_max_ttl(),
        );
    let cleanup_interval = config.session.cleanup_interval();
    let app_state = Arc::new(AppState::new(
        sessions,
        Arc::new(PgUserStore::new(db_pool)),
        Arc::new(google),
        config.session,
    ));

    // Periodic cleanup of expired sessions; the first tick fires immediately.
    let cleanup_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            match cleanup_state.sessions.delete_expired().await {
                Ok(count) if count > 0 => {
                    tracing::info!(deleted_sessions = count, "Cleaned up expired sessions");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = ?e, "Failed to cleanup expired sessions");
                }
            }
        }
    });

    let router = app::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: config.bind_addr.clone(),
            details: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Bind {
            addr: config.bind_addr.clone(),
            details: e.to_string(),
        })?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
