use social_login_server::{
    app,
    auth::{AppState, PgIdentityStore, ProviderClient},
    config::ServerConfig,
};
use social_login_identity::InMemorySessionStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    // Provider clients must not follow redirects
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to build HTTP client");

    let registrations = config
        .providers
        .registrations()
        .expect("invalid provider configuration");
    if registrations.is_empty() {
        tracing::warn!("No providers configured; login is unavailable");
    }

    let providers = registrations
        .iter()
        .map(|registration| {
            let client = ProviderClient::new(registration, http.clone())
                .expect("invalid provider registration");
            tracing::info!(provider = %registration.provider(), "Registered provider");
            client
        })
        .collect();

    let sessions = Arc::new(InMemorySessionStore::with_idle_timeout(
        chrono::Duration::minutes(config.session.idle_minutes),
    ));
    tokio::spawn(purge_sessions(sessions.clone()));

    // Create application state
    let app_state = Arc::new(AppState::new(
        Arc::new(PgIdentityStore::new(db_pool)),
        sessions,
        providers,
        config.session,
    ));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app::router(app_state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Periodically drops sessions that have been idle past their timeout.
async fn purge_sessions(sessions: Arc<InMemorySessionStore>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let purged = sessions.purge_expired().await;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
