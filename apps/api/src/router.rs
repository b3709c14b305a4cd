use std::sync::Arc;

use axum::{routing::get, Router};

use booking_cell::router::booking_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "IME Scheduling Portal API is running!" }))
        .nest("/bookings", booking_routes(state.clone()))
}
