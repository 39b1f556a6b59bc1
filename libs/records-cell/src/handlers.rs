use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ConsultationQuery, ConsultationRequest, ResultsQuery};
use crate::services::RecordsService;

#[axum::debug_handler]
pub async fn list_results(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecordsService::new(&config);

    let patient_id = service.patient_id(&user.id, token).await?;
    let results = service
        .list_results(&patient_id, query.abnormal_only.unwrap_or(false), token)
        .await?;

    Ok(Json(json!({
        "results": results,
        "total": results.len(),
    })))
}

#[axum::debug_handler]
pub async fn list_consultations(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ConsultationQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecordsService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let consultations = service
        .list_consultations(&professional_id, query.patient_id.as_deref(), token)
        .await?;

    Ok(Json(json!({
        "consultations": consultations,
        "total": consultations.len(),
    })))
}

#[axum::debug_handler]
pub async fn create_consultation(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = RecordsService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let consultation = service.create_consultation(&professional_id, request, token).await?;

    Ok(Json(json!({
        "success": true,
        "consultation": consultation,
    })))
}
