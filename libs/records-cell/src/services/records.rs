// libs/records-cell/src/services/records.rs
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};
use urlencoding::encode;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Consultation, ConsultationRequest, MedicalResult, RecordsError, ResultSummary};
use crate::services::chart;

pub struct RecordsService {
    supabase: SupabaseClient,
}

impl RecordsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn row_id(&self, table: &str, user_id: &str, auth_token: &str) -> Result<Option<String>, RecordsError> {
        let path = format!("/rest/v1/{}?user_id=eq.{}&select=id", table, encode(user_id));
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| RecordsError::DatabaseError(e.to_string()))?;

        Ok(rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string))
    }

    /// Resolve the `patients` row id of an authenticated user.
    pub async fn patient_id(&self, user_id: &str, auth_token: &str) -> Result<String, RecordsError> {
        self.row_id("patients", user_id, auth_token)
            .await?
            .ok_or_else(|| RecordsError::PatientProfileNotFound(user_id.to_string()))
    }

    pub async fn professional_id(&self, user_id: &str, auth_token: &str) -> Result<String, RecordsError> {
        self.row_id("professionals", user_id, auth_token)
            .await?
            .ok_or_else(|| RecordsError::ProfessionalNotFound(user_id.to_string()))
    }

    pub async fn list_results(
        &self,
        patient_id: &str,
        abnormal_only: bool,
        auth_token: &str,
    ) -> Result<Vec<ResultSummary>, RecordsError> {
        let path = format!(
            "/rest/v1/medical_results?patient_id=eq.{}&select=*&order=result_date.desc",
            encode(patient_id)
        );
        let results: Vec<MedicalResult> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| RecordsError::DatabaseError(e.to_string()))?;

        debug!("Loaded {} medical results for patient {}", results.len(), patient_id);
        Ok(chart::summarize_results(results, abnormal_only))
    }

    pub async fn list_consultations(
        &self,
        professional_id: &str,
        patient_id: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Consultation>, RecordsError> {
        let mut path = format!(
            "/rest/v1/consultations?professional_id=eq.{}&select=*&order=date.desc",
            encode(professional_id)
        );
        if let Some(patient_id) = patient_id {
            path.push_str(&format!("&patient_id=eq.{}", encode(patient_id)));
        }

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| RecordsError::DatabaseError(e.to_string()))
    }

    async fn follows(&self, professional_id: &str, patient_id: &str, auth_token: &str) -> Result<bool, RecordsError> {
        let path = format!(
            "/rest/v1/professional_patients?professional_id=eq.{}&id=eq.{}&select=id",
            encode(professional_id),
            encode(patient_id)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| RecordsError::DatabaseError(e.to_string()))?;
        Ok(!rows.is_empty())
    }

    pub async fn create_consultation(
        &self,
        professional_id: &str,
        request: ConsultationRequest,
        auth_token: &str,
    ) -> Result<Consultation, RecordsError> {
        let new_consultation = chart::compose_consultation(professional_id, request)?;

        if !self.follows(professional_id, &new_consultation.patient_id, auth_token).await? {
            return Err(RecordsError::PatientNotFound(new_consultation.patient_id));
        }

        let body = serde_json::to_value(&new_consultation).map_err(|e| RecordsError::DatabaseError(e.to_string()))?;
        let row = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/consultations", auth_token, body)
            .await
            .map_err(|e| RecordsError::DatabaseError(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| RecordsError::DatabaseError("Insert returned no row".to_string()))?;
        let consultation: Consultation =
            serde_json::from_value(row).map_err(|e| RecordsError::DatabaseError(e.to_string()))?;

        info!(
            "Professional {} recorded consultation {} for patient {}",
            professional_id, consultation.id, consultation.patient_id
        );
        Ok(consultation)
    }
}
