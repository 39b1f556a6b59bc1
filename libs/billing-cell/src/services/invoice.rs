// libs/billing-cell/src/services/invoice.rs
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use urlencoding::encode;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Invoice, InvoiceDraft, InvoiceError, InvoiceStatus, PaymentMethod, Quote};
use crate::services::pricing;

pub struct InvoiceService {
    supabase: SupabaseClient,
    default_tax_rate: f64,
}

impl InvoiceService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            default_tax_rate: config.default_tax_rate,
        }
    }

    pub fn quote(&self, amount: f64, tax_rate: Option<f64>) -> Result<Quote, InvoiceError> {
        pricing::quote(amount, tax_rate.unwrap_or(self.default_tax_rate))
    }

    pub async fn professional_id(&self, user_id: &str, auth_token: &str) -> Result<String, InvoiceError> {
        let path = format!("/rest/v1/professionals?user_id=eq.{}&select=id", encode(user_id));
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| InvoiceError::DatabaseError(e.to_string()))?;

        rows.first()
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| InvoiceError::ProfessionalNotFound(user_id.to_string()))
    }

    async fn count_invoices(&self, professional_id: &str, auth_token: &str) -> Result<usize, InvoiceError> {
        let path = format!("/rest/v1/invoices?professional_id=eq.{}&select=id", encode(professional_id));
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| InvoiceError::DatabaseError(e.to_string()))?;
        Ok(rows.len())
    }

    pub async fn create_invoice(
        &self,
        professional_id: &str,
        draft: InvoiceDraft,
        auth_token: &str,
    ) -> Result<Invoice, InvoiceError> {
        self.create_invoice_on(professional_id, draft, Utc::now().date_naive(), auth_token)
            .await
    }

    pub async fn create_invoice_on(
        &self,
        professional_id: &str,
        draft: InvoiceDraft,
        issued_date: NaiveDate,
        auth_token: &str,
    ) -> Result<Invoice, InvoiceError> {
        pricing::validate_draft(&draft, self.default_tax_rate, issued_date)?;

        let existing = self.count_invoices(professional_id, auth_token).await?;
        let new_invoice = pricing::build_invoice(professional_id, draft, self.default_tax_rate, issued_date, existing)?;
        debug!("Creating invoice {} for patient {}", new_invoice.invoice_number, new_invoice.patient_id);

        let body = serde_json::to_value(&new_invoice).map_err(|e| InvoiceError::DatabaseError(e.to_string()))?;
        let rows = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/invoices", auth_token, body)
            .await
            .map_err(|e| InvoiceError::DatabaseError(e.to_string()))?;

        let invoice = first_invoice(rows)?
            .ok_or_else(|| InvoiceError::DatabaseError("Insert returned no row".to_string()))?;
        info!("Invoice {} created ({} total)", invoice.invoice_number, invoice.total_amount);
        Ok(invoice)
    }

    pub async fn get_invoice(
        &self,
        professional_id: &str,
        invoice_id: &str,
        auth_token: &str,
    ) -> Result<Invoice, InvoiceError> {
        let path = format!(
            "/rest/v1/invoices?id=eq.{}&professional_id=eq.{}&select=*",
            encode(invoice_id),
            encode(professional_id)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| InvoiceError::DatabaseError(e.to_string()))?;

        first_invoice(rows)?.ok_or_else(|| InvoiceError::NotFound(invoice_id.to_string()))
    }

    pub async fn mark_paid(
        &self,
        professional_id: &str,
        invoice_id: &str,
        payment_method: PaymentMethod,
        auth_token: &str,
    ) -> Result<Invoice, InvoiceError> {
        let update = json!({
            "status": InvoiceStatus::Paid,
            "paid_date": Utc::now().to_rfc3339(),
            "payment_method": payment_method,
        });
        self.transition(professional_id, invoice_id, InvoiceStatus::Paid, update, auth_token)
            .await
    }

    pub async fn cancel_invoice(
        &self,
        professional_id: &str,
        invoice_id: &str,
        auth_token: &str,
    ) -> Result<Invoice, InvoiceError> {
        let update = json!({ "status": InvoiceStatus::Cancelled });
        self.transition(professional_id, invoice_id, InvoiceStatus::Cancelled, update, auth_token)
            .await
    }

    async fn transition(
        &self,
        professional_id: &str,
        invoice_id: &str,
        target: InvoiceStatus,
        update: Value,
        auth_token: &str,
    ) -> Result<Invoice, InvoiceError> {
        let current = self.get_invoice(professional_id, invoice_id, auth_token).await?;
        if let Err(e) = pricing::ensure_transition(current.status, target) {
            warn!("Rejected invoice {} transition: {}", invoice_id, e);
            return Err(e);
        }

        let path = format!(
            "/rest/v1/invoices?id=eq.{}&professional_id=eq.{}",
            encode(invoice_id),
            encode(professional_id)
        );
        let rows = self
            .supabase
            .write_returning(Method::PATCH, &path, auth_token, update)
            .await
            .map_err(|e| InvoiceError::DatabaseError(e.to_string()))?;

        let invoice = first_invoice(rows)?.ok_or_else(|| InvoiceError::NotFound(invoice_id.to_string()))?;
        info!("Invoice {} is now {}", invoice.invoice_number, invoice.status);
        Ok(invoice)
    }
}

fn first_invoice(rows: Vec<Value>) -> Result<Option<Invoice>, InvoiceError> {
    rows.into_iter()
        .next()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| InvoiceError::DatabaseError(format!("Failed to parse invoice: {}", e)))
}
