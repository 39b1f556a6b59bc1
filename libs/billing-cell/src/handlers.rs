use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{InvoiceDraft, PaymentRequest, QuoteRequest};
use crate::services::InvoiceService;

/// Compute tax and total for an amount without persisting anything.
#[axum::debug_handler]
pub async fn quote_invoice(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Value>, AppError> {
    let service = InvoiceService::new(&config);
    let quote = service.quote(request.amount, request.tax_rate)?;

    Ok(Json(json!({ "quote": quote })))
}

#[axum::debug_handler]
pub async fn create_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(draft): Json<InvoiceDraft>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = InvoiceService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let invoice = service.create_invoice(&professional_id, draft, token).await?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice,
    })))
}

#[axum::debug_handler]
pub async fn pay_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = InvoiceService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let invoice = service
        .mark_paid(&professional_id, &invoice_id, request.payment_method, token)
        .await?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice,
    })))
}

#[axum::debug_handler]
pub async fn cancel_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = InvoiceService::new(&config);

    let professional_id = service.professional_id(&user.id, token).await?;
    let invoice = service.cancel_invoice(&professional_id, &invoice_id, token).await?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice,
    })))
}
