//! FIR Tracker API Server
//!
//! REST API for registering cases, tracking investigation deadlines and
//! triggering officer alerts.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::Args;
pub use error::ApiError;
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Cases
        .route("/api/cases", post(handlers::create_case).get(handlers::list_cases))
        .route("/api/cases/:id", get(handlers::get_case).put(handlers::update_case))
        .route("/api/cases/:id/complete", post(handlers::complete_case))
        // Dashboard
        .route("/api/stats", get(handlers::case_stats))
        .route("/api/analytics/stations", get(handlers::station_stats))
        .route("/api/analytics/stations/:station/officers", get(handlers::officer_stats))
        .route("/api/analytics/sub-divisions", get(handlers::sub_division_stats))
        .route("/api/analytics/performance", get(handlers::performance))
        // Alerts
        .route("/api/alerts/sweep", post(handlers::trigger_sweep))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
