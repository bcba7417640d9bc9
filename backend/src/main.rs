//! Farm Operations Platform - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use farm_backend::{
    config::{Config, StorageBackend},
    create_app,
    repository::{postgres, PgFatteningRepository, PgMilkReceptionRepository},
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farm_server=debug,farm_backend=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Farm Operations Server");
    tracing::info!("Environment: {}", config.environment);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = match config.storage.backend {
        StorageBackend::Postgres => connect_postgres(config).await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            AppState::in_memory(config)
        }
    };

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect the pool, run migrations in development and start forwarding
/// database notifications into the change feed
async fn connect_postgres(config: Config) -> anyhow::Result<AppState> {
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let state = AppState::new(
        Arc::new(PgFatteningRepository::new(db_pool.clone())),
        Arc::new(PgMilkReceptionRepository::new(db_pool.clone())),
        config,
    );

    let feed = state.changes.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = postgres::forward_notifications(db_pool.clone(), feed.clone()).await {
                tracing::error!("Change listener stopped: {}", e);
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    });

    Ok(state)
}
