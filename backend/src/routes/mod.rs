//! Route definitions for the Farm Operations Platform

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Everything else is scoped to one farm
        .nest("/farms/:farm_id", farm_routes())
}

/// Farm-scoped routes
fn farm_routes() -> Router<AppState> {
    Router::new()
        .nest("/fattening", fattening_routes())
        .nest("/milk", milk_routes())
        .route("/events", get(handlers::stream_changes))
}

/// Cattle fattening routes
fn fattening_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_fattening).post(handlers::create_fattening),
        )
        .route("/analytics", get(handlers::get_fattening_analytics))
        .route(
            "/:id",
            get(handlers::get_fattening)
                .put(handlers::update_fattening)
                .delete(handlers::delete_fattening),
        )
        .route("/:id/complete", post(handlers::complete_fattening))
}

/// Milk reception routes
fn milk_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/receptions",
            get(handlers::list_receptions).post(handlers::record_reception),
        )
        .route("/transfers", post(handlers::transfer_milk))
        .route("/tanks", get(handlers::get_tank_states))
        .route("/tanks/:tank/capacity", put(handlers::update_tank_capacity))
        .route("/alerts", get(handlers::get_milk_alerts))
        .route("/overflow-plan", get(handlers::get_overflow_plan))
        .route("/dashboard", get(handlers::get_milk_dashboard))
}
