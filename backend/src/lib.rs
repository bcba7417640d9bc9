//! Farm Operations Platform - Backend
//!
//! Livestock fattening tracking and milk reception capacity management for
//! multi-farm agro businesses.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod routes;
pub mod services;

pub use config::Config;

use repository::{
    FatteningRepository, InMemoryFatteningRepository, InMemoryMilkReceptionRepository,
    MilkReceptionRepository,
};
use services::{ChangeFeed, FatteningService, MilkReceptionService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub fattening_repo: Arc<dyn FatteningRepository>,
    pub milk_repo: Arc<dyn MilkReceptionRepository>,
    pub changes: ChangeFeed,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        fattening_repo: Arc<dyn FatteningRepository>,
        milk_repo: Arc<dyn MilkReceptionRepository>,
        config: Config,
    ) -> Self {
        Self {
            fattening_repo,
            milk_repo,
            changes: ChangeFeed::new(config.changes.channel_capacity),
            config: Arc::new(config),
        }
    }

    /// State backed by the in-memory repositories
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            Arc::new(InMemoryFatteningRepository::new()),
            Arc::new(InMemoryMilkReceptionRepository::new()),
            config,
        )
    }

    pub fn fattening_service(&self) -> FatteningService {
        FatteningService::new(
            self.fattening_repo.clone(),
            self.changes.clone(),
            self.config.fattening.thresholds(),
        )
    }

    pub fn milk_service(&self) -> MilkReceptionService {
        MilkReceptionService::new(
            self.milk_repo.clone(),
            self.changes.clone(),
            self.config.milk.capacities(),
            self.config.milk.utilization_policy(),
            self.config.milk.freshness_policy(),
        )
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Farm Operations Platform API v1.0"
}
