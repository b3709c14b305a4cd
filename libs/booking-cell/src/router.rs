// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    // All booking operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::create_booking).get(handlers::list_bookings))
        .route("/{booking_id}", get(handlers::get_booking))
        .route("/{booking_id}/progress", patch(handlers::update_progress))
        .route("/{booking_id}/reschedule", patch(handlers::reschedule_booking))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
