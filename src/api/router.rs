use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no bearer token required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render))
        .route("/api/dashboard", get(handlers::dashboard::snapshot))
        // Guarded by CRON_SECRET inside the handler
        .route("/api/cron", get(handlers::analyze::cron).post(handlers::analyze::cron));

    // Protected API routes: require Bearer token when API_TOKEN is set
    let protected = Router::new()
        .route("/api/analyze", get(handlers::analyze::analyze).post(handlers::analyze::analyze))
        // Ledger
        .route("/api/positions", get(handlers::ledger::positions))
        .route("/api/trades", get(handlers::ledger::trades))
        .route("/api/thoughts", get(handlers::ledger::thoughts))
        // Control
        .route("/api/control/stop", post(handlers::control::stop))
        .route("/api/control/resume", post(handlers::control::resume))
        .route("/api/control/status", get(handlers::control::status))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
