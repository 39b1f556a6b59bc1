use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::AppointmentStatus;
use crate::services::form::BookingStep;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Action '{action}' is not allowed while {step}")]
    InvalidAction { action: &'static str, step: BookingStep },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown {kind}: {id}")]
    UnknownReference { kind: &'static str, id: String },

    #[error("Date {date} is outside the bookable window of {horizon_days} days")]
    DateOutOfRange { date: NaiveDate, horizon_days: u32 },

    #[error("Time slot not found: {0}")]
    SlotNotFound(String),

    #[error("Select at least one time slot before confirming")]
    NothingSelected,

    #[error("Time slot {0} has already started")]
    SlotExpired(String),

    #[error("{provider} already has an appointment at {start}")]
    SlotConflict { provider: String, start: NaiveDateTime },

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(Uuid),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::InvalidAction { .. } => AppError::BadRequest(message),
            BookingError::ValidationError(_)
            | BookingError::UnknownReference { .. }
            | BookingError::DateOutOfRange { .. }
            | BookingError::SlotNotFound(_)
            | BookingError::NothingSelected
            | BookingError::SlotExpired(_) => AppError::ValidationError(message),
            BookingError::SlotConflict { .. }
            | BookingError::InvalidStatusTransition { .. } => AppError::Conflict(message),
            BookingError::AppointmentNotFound(_) => AppError::NotFound(message),
        }
    }
}
