use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ConversationQuery, SendMessageRequest};
use crate::services::MessagingService;

#[axum::debug_handler]
pub async fn list_conversations(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = MessagingService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let conversations = service
        .list_conversations(&professional_id, query.search.as_deref(), token)
        .await?;
    let unread_total: usize = conversations.iter().map(|c| c.unread_count).sum();

    Ok(Json(json!({
        "conversations": conversations,
        "total": conversations.len(),
        "unread_total": unread_total,
    })))
}

#[axum::debug_handler]
pub async fn get_thread(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = MessagingService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let messages = service.get_thread(&professional_id, &patient_id, token).await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "messages": messages,
    })))
}

#[axum::debug_handler]
pub async fn send_message(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = MessagingService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let message = service
        .send_message(&professional_id, &patient_id, &request.content, request.attachment_url, token)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": message,
    })))
}

#[axum::debug_handler]
pub async fn mark_thread_read(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = MessagingService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let (updated, messages) = service.mark_read(&professional_id, &patient_id, token).await?;

    Ok(Json(json!({
        "success": true,
        "updated": updated,
        "messages": messages,
    })))
}
