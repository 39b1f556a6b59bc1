// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_models::auth::Role;
use shared_utils::access::role_guard;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::session::BookingState;

pub fn booking_routes(state: Arc<BookingState>) -> Router {
    // Patient area: token first, then role
    Router::new()
        // Reference data
        .route("/catalog/centers", get(handlers::list_centers))
        .route("/catalog/doctors", get(handlers::list_doctors))
        .route("/catalog/tests", get(handlers::list_tests))
        .route("/catalog/nurses", get(handlers::list_nurses))

        // Booking form
        .route("/session", get(handlers::get_session))
        .route("/session/actions", post(handlers::apply_action))

        // Appointments
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments/upcoming", get(handlers::upcoming_appointments))
        .route("/appointments/past", get(handlers::past_appointments))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/appointments/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/appointments/{appointment_id}/reschedule", post(handlers::reschedule_appointment))

        .layer(middleware::from_fn_with_state(Role::Patient, role_guard))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
