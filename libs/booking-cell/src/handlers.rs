// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CenterQuery, DoctorQuery};
use crate::services::form::BookingAction;
use crate::services::session::BookingState;

// ==============================================================================
// CATALOG HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_centers(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<CenterQuery>,
) -> Result<Json<Value>, AppError> {
    let centers = state.catalog.centers_for(query.modality);

    Ok(Json(json!({
        "centers": centers,
        "total": centers.len(),
    })))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.catalog.filter_doctors(&query);

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len(),
    })))
}

pub async fn list_tests(State(state): State<Arc<BookingState>>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({ "tests": state.catalog.tests })))
}

pub async fn list_nurses(State(state): State<Arc<BookingState>>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({ "nurses": state.catalog.nurses })))
}

// ==============================================================================
// BOOKING FORM HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let view = state.with_session(&user.id, |session| session.form.view()).await;

    Ok(Json(json!({ "form": view })))
}

/// Apply one form action; the response carries the outcome and the new form
/// state.
#[axum::debug_handler]
pub async fn apply_action(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Json(action): Json<BookingAction>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} applies booking action {}", user.id, action.name());

    let (event, view) = state
        .with_session(&user.id, |session| {
            let event = session.apply(action)?;
            Ok::<_, crate::error::BookingError>((event, session.form.view()))
        })
        .await?;

    Ok(Json(json!({
        "event": event,
        "form": view,
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.appointments(&user.id).await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

#[axum::debug_handler]
pub async fn upcoming_appointments(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .with_session(&user.id, |session| {
            session.store.upcoming().into_iter().cloned().collect::<Vec<_>>()
        })
        .await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

#[axum::debug_handler]
pub async fn past_appointments(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .with_session(&user.id, |session| {
            session.store.past().into_iter().cloned().collect::<Vec<_>>()
        })
        .await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

/// Cancelling an id the user does not have is a no-op, reported with a null
/// appointment.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .with_session(&user.id, |session| {
            session.store.cancel(appointment_id).map(|a| a.cloned())
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .with_session(&user.id, |session| {
            session.store.complete(appointment_id).map(|a| a.clone())
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let view = state
        .with_session(&user.id, |session| session.reschedule(appointment_id))
        .await?;

    Ok(Json(json!({
        "success": true,
        "form": view,
        "message": "Previous appointment cancelled, choose a new date",
    })))
}
