use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::access::role_guard;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn results_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_results))
        .layer(middleware::from_fn_with_state(Role::Patient, role_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn consultation_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_consultations).post(handlers::create_consultation))
        .layer(middleware::from_fn_with_state(Role::Professional, role_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
