use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::HeaderMap,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::bearer_token;
use shared_utils::jwt;

use crate::models::{AuthSession, PortalProfile, ResetPasswordRequest, SignInRequest, SignUpRequest};
use crate::services::AuthService;

pub async fn sign_in(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let service = AuthService::new(config);
    let session = service.sign_in(&request.email, &request.password).await?;

    Ok(Json(session))
}

pub async fn sign_up(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<SignUpRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AuthService::new(config);
    let user = service.sign_up(&request).await?;

    Ok(Json(json!({
        "success": true,
        "user": user,
        "message": "Check your inbox to confirm your email address",
    })))
}

pub async fn reset_password(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AuthService::new(config);
    service.reset_password(&request.email).await?;

    Ok(Json(json!({
        "success": true,
        "message": "If the address exists, a reset link has been sent",
    })))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = bearer_token(&headers)?;
    let user = jwt::validate_token(token, &config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    Ok(Json(TokenResponse {
        valid: true,
        role: Some(user.portal_role().to_string()),
        user_id: user.id,
        email: user.email,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = bearer_token(&headers)?;
    let valid = jwt::validate_token(token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

#[axum::debug_handler]
pub async fn sign_out(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Signing out user: {}", user.id);

    let service = AuthService::new(config);
    service.sign_out(auth.token()).await?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<PortalProfile>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let service = AuthService::new(config);
    let profile = service.load_profile(&user, auth.token()).await?;

    Ok(Json(profile))
}
