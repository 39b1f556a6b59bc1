// libs/billing-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Cancelled,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Unpaid => write!(f, "unpaid"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
}

/// What a professional fills in to bill a patient. `tax_rate` is a percentage.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceDraft {
    pub patient_id: String,
    pub consultation_id: Option<String>,
    pub amount: f64,
    pub tax_rate: Option<f64>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub amount: f64,
    pub tax_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub amount: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub payment_method: PaymentMethod,
}

/// Row of the `invoices` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub professional_id: String,
    pub patient_id: String,
    pub consultation_id: Option<String>,
    pub invoice_number: String,
    pub amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub status: InvoiceStatus,
    pub issued_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_date: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewInvoice {
    pub professional_id: String,
    pub patient_id: String,
    pub consultation_id: Option<String>,
    pub invoice_number: String,
    pub amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub status: InvoiceStatus,
    pub issued_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Tax rate must be zero or positive")]
    InvalidTaxRate,

    #[error("Due date {due} is before the issue date {issued}")]
    InvalidDueDate { issued: NaiveDate, due: NaiveDate },

    #[error("Cannot move invoice from {from} to {to}")]
    InvalidStatusTransition { from: InvoiceStatus, to: InvoiceStatus },

    #[error("Invoice {0} not found")]
    NotFound(String),

    #[error("No professional profile for user {0}")]
    ProfessionalNotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        let message = err.to_string();
        match err {
            InvoiceError::InvalidAmount
            | InvoiceError::InvalidTaxRate
            | InvoiceError::InvalidDueDate { .. } => AppError::ValidationError(message),
            InvoiceError::InvalidStatusTransition { .. } => AppError::Conflict(message),
            InvoiceError::NotFound(_) => AppError::NotFound(message),
            InvoiceError::ProfessionalNotFound(_) => AppError::Forbidden(message),
            InvoiceError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
