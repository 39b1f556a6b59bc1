use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::access::role_guard;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn messaging_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/conversations", get(handlers::list_conversations))
        .route("/conversations/{patient_id}", get(handlers::get_thread))
        .route("/conversations/{patient_id}", post(handlers::send_message))
        .route("/conversations/{patient_id}/read", post(handlers::mark_thread_read))
        .layer(middleware::from_fn_with_state(Role::Professional, role_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
