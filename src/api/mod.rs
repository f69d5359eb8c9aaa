use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;

pub mod handlers;
pub mod responses;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/garages", get(handlers::get_garages))
        .route("/api/garages/{id}/timeline", get(handlers::get_timeline))
        .route("/api/garages/{id}/profile", get(handlers::get_profile))
        .route("/api/dates", get(handlers::get_dates))
        .with_state(state)
}
