use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use auth_cell::router::auth_routes;
use billing_cell::router::billing_routes;
use booking_cell::booking_routes;
use booking_cell::services::BookingState;
use messaging_cell::router::messaging_routes;
use records_cell::router::{consultation_routes, results_routes};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let booking_state = Arc::new(BookingState::new(state.clone()));

    Router::new()
        .route("/", get(|| async { "Clinic portal API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/booking", booking_routes(booking_state))
        .nest("/professional/messages", messaging_routes(state.clone()))
        .nest("/professional/invoices", billing_routes(state.clone()))
        .nest("/professional/consultations", consultation_routes(state.clone()))
        .nest("/results", results_routes(state))
}
