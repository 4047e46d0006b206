//! REST API Routes
//!
//! - `/data` - record create and lookup
//! - `/health` - probes, outside the body limit

pub mod data;
pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tierstore_core::HttpConfig;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
///
/// Layers applied:
/// 1. Request body limit on the data routes (`http.max_request_body`)
/// 2. HTTP tracing
pub fn create_api_router(state: AppState, http: &HttpConfig) -> Router {
    let health_state = health::HealthState::new(
        state.store.memory().clone(),
        state.data_root.clone(),
        state.start_time,
    );

    let data_routes = Router::new()
        .route("/data", get(data::read).post(data::create))
        .layer(DefaultBodyLimit::max(http.max_request_body))
        .with_state(state);

    Router::new()
        .merge(data_routes)
        .nest("/health", health::create_router(health_state))
        .layer(TraceLayer::new_for_http())
}
