// libs/messaging-cell/src/services/messaging.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use urlencoding::encode;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ConversationSummary, Message, MessagingError, ProfessionalPatient};
use crate::services::threads;

pub struct MessagingService {
    supabase: SupabaseClient,
}

impl MessagingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Resolve the `professionals` row id of an authenticated user.
    pub async fn professional_id(&self, user_id: &str, auth_token: &str) -> Result<String, MessagingError> {
        let path = format!("/rest/v1/professionals?user_id=eq.{}&select=id", encode(user_id));
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        rows.first()
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| MessagingError::ProfessionalNotFound(user_id.to_string()))
    }

    async fn patients(&self, professional_id: &str, auth_token: &str) -> Result<Vec<ProfessionalPatient>, MessagingError> {
        let path = format!(
            "/rest/v1/professional_patients?professional_id=eq.{}&select=*&order=last_name.asc",
            encode(professional_id)
        );
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))
    }

    async fn messages(
        &self,
        professional_id: &str,
        patient_id: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Message>, MessagingError> {
        let mut path = format!(
            "/rest/v1/messages?professional_id=eq.{}&select=*&order=created_at.desc",
            encode(professional_id)
        );
        if let Some(patient_id) = patient_id {
            path.push_str(&format!("&patient_id=eq.{}", encode(patient_id)));
        }

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))
    }

    pub async fn list_conversations(
        &self,
        professional_id: &str,
        search: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<ConversationSummary>, MessagingError> {
        let patients = self.patients(professional_id, auth_token).await?;
        let messages = self.messages(professional_id, None, auth_token).await?;
        debug!(
            "Summarizing {} messages across {} patients for {}",
            messages.len(),
            patients.len(),
            professional_id
        );

        let summaries = threads::summarize_conversations(&patients, &messages);
        Ok(match search {
            Some(query) => threads::filter_by_name(summaries, query),
            None => summaries,
        })
    }

    pub async fn get_thread(
        &self,
        professional_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Message>, MessagingError> {
        let messages = self.messages(professional_id, Some(patient_id), auth_token).await?;
        Ok(threads::thread(&messages, patient_id))
    }

    pub async fn send_message(
        &self,
        professional_id: &str,
        patient_id: &str,
        content: &str,
        attachment_url: Option<String>,
        auth_token: &str,
    ) -> Result<Message, MessagingError> {
        let new_message = threads::compose(professional_id, patient_id, content, attachment_url)?;

        let patients = self.patients(professional_id, auth_token).await?;
        if !patients.iter().any(|p| p.id == patient_id) {
            return Err(MessagingError::PatientNotFound(patient_id.to_string()));
        }

        let body = serde_json::to_value(&new_message).map_err(|e| MessagingError::DatabaseError(e.to_string()))?;
        let rows = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/messages", auth_token, body)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| MessagingError::DatabaseError("Insert returned no row".to_string()))?;
        let message: Message =
            serde_json::from_value(row).map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        info!("Professional {} sent message {} to patient {}", professional_id, message.id, patient_id);
        Ok(message)
    }

    /// Flag the patient's unread messages as read. Returns how many changed
    /// and the thread as it now reads.
    pub async fn mark_read(
        &self,
        professional_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<(usize, Vec<Message>), MessagingError> {
        let mut thread = self.get_thread(professional_id, patient_id, auth_token).await?;
        let changed = threads::mark_thread_read(&mut thread, patient_id);
        if changed == 0 {
            debug!("No unread messages from {}", patient_id);
            return Ok((0, thread));
        }

        let path = format!(
            "/rest/v1/messages?professional_id=eq.{}&patient_id=eq.{}&sender_type=eq.patient&is_read=eq.false",
            encode(professional_id),
            encode(patient_id)
        );
        self.supabase
            .request_no_content(Method::PATCH, &path, Some(auth_token), Some(json!({ "is_read": true })))
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        debug!("Marked {} messages from {} as read", changed, patient_id);
        Ok((changed, thread))
    }
}
