use std::sync::Arc;

use axum::{
    Router,
    routing::post,
    middleware,
};

use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::access::role_guard;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn billing_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/quote", post(handlers::quote_invoice))
        .route("/", post(handlers::create_invoice))
        .route("/{invoice_id}/pay", post(handlers::pay_invoice))
        .route("/{invoice_id}/cancel", post(handlers::cancel_invoice))
        .layer(middleware::from_fn_with_state(Role::Professional, role_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
