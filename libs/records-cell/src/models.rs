// libs/records-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;

/// One measured value inside a lab report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultItem {
    pub name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub is_abnormal: bool,
}

/// A lab report as shown to the patient (`medical_results` row). PDF reports
/// carry a `pdf_url` and usually no itemized values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalResult {
    pub id: String,
    pub patient_id: String,
    pub test_name: String,
    pub collection_date: NaiveDate,
    pub result_date: NaiveDate,
    pub lab_name: String,
    pub is_pdf: bool,
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<TestResultItem>>,
    pub created_at: DateTime<Utc>,
}

impl MedicalResult {
    pub fn abnormal_count(&self) -> usize {
        self.results
            .as_ref()
            .map(|items| items.iter().filter(|i| i.is_abnormal).count())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    #[serde(flatten)]
    pub result: MedicalResult,
    pub abnormal_count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsQuery {
    pub abnormal_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: String,
    pub professional_id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub date: NaiveDate,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub followup_needed: bool,
    pub followup_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsultationQuery {
    pub patient_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsultationRequest {
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub date: NaiveDate,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub followup_needed: bool,
    pub followup_date: Option<NaiveDate>,
}

/// Consultation about to be inserted; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewConsultation {
    pub professional_id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub date: NaiveDate,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub followup_needed: bool,
    pub followup_date: Option<NaiveDate>,
}

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("No patient profile for user {0}")]
    PatientProfileNotFound(String),

    #[error("No professional profile for user {0}")]
    ProfessionalNotFound(String),

    #[error("Patient {0} is not followed by this professional")]
    PatientNotFound(String),

    #[error("Invalid consultation: {0}")]
    InvalidConsultation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RecordsError> for AppError {
    fn from(err: RecordsError) -> Self {
        let message = err.to_string();
        match err {
            RecordsError::PatientProfileNotFound(_) | RecordsError::ProfessionalNotFound(_) => {
                AppError::Forbidden(message)
            }
            RecordsError::PatientNotFound(_) => AppError::NotFound(message),
            RecordsError::InvalidConsultation(_) => AppError::ValidationError(message),
            RecordsError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
