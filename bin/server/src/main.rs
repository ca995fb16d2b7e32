use hearthside_core::EventLogger;
use hearthside_server::{
    app,
    auth::{AppState, db::PgRevocationStore},
    config::ServerConfig,
};
use hearthside_session::{MemoryRevocationStore, PlatformIssuer, RevocationStore};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
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
    tracing::info!(environment = %config.environment, "Loaded configuration");
    let logger = EventLogger::new(config.environment.clone());

    let revocations: Arc<dyn RevocationStore> = match &config.database_url {
        Some(database_url) => {
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .expect("failed to connect to database");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .expect("failed to run migrations");

            Arc::new(PgRevocationStore::new(db_pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, revocations are kept in memory");
            Arc::new(MemoryRevocationStore::new())
        }
    };

    let issuer = PlatformIssuer::new(config.service_settings(), revocations);
    if let Err(report) = issuer.services() {
        logger.critical("platform_services_unavailable", &report, json!({}));
        std::process::exit(1);
    }

    let state = Arc::new(AppState::new(
        Arc::new(issuer),
        config.session.clone(),
        config.gate.clone(),
        logger,
    ));
    let app = app::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
