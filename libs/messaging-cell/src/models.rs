// libs/messaging-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Professional,
    Patient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub professional_id: String,
    pub patient_id: String,
    pub sender_type: SenderType,
    pub content: String,
    pub is_read: bool,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_unread_from_patient(&self) -> bool {
        !self.is_read && self.sender_type == SenderType::Patient
    }
}

/// Message about to be inserted; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub professional_id: String,
    pub patient_id: String,
    pub sender_type: SenderType,
    pub content: String,
    pub is_read: bool,
    pub attachment_url: Option<String>,
}

/// A patient followed by a professional (`professional_patients` row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalPatient {
    pub id: String,
    pub professional_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ProfessionalPatient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub patient: ProfessionalPatient,
    pub latest_message: Option<Message>,
    pub unread_count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub attachment_url: Option<String>,
}

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Message content cannot be empty")]
    EmptyMessage,

    #[error("No professional profile for user {0}")]
    ProfessionalNotFound(String),

    #[error("Patient {0} is not followed by this professional")]
    PatientNotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<MessagingError> for AppError {
    fn from(err: MessagingError) -> Self {
        let message = err.to_string();
        match err {
            MessagingError::EmptyMessage => AppError::ValidationError(message),
            MessagingError::ProfessionalNotFound(_) => AppError::Forbidden(message),
            MessagingError::PatientNotFound(_) => AppError::NotFound(message),
            MessagingError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
