use chrono::{Datelike, NaiveDate};

use crate::models::{InvoiceDraft, InvoiceError, InvoiceStatus, NewInvoice, Quote};

const INVOICE_NUMBER_BASE: usize = 1000;

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn quote(amount: f64, tax_rate: f64) -> Result<Quote, InvoiceError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(InvoiceError::InvalidAmount);
    }
    if !tax_rate.is_finite() || tax_rate < 0.0 {
        return Err(InvoiceError::InvalidTaxRate);
    }

    let tax_amount = round_cents(amount * tax_rate / 100.0);
    Ok(Quote {
        amount: round_cents(amount),
        tax_rate,
        tax_amount,
        total_amount: round_cents(amount + tax_amount),
    })
}

/// `INV-<year>-<1000 + existing + 1>`
pub fn invoice_number(year: i32, existing_count: usize) -> String {
    format!("INV-{}-{}", year, INVOICE_NUMBER_BASE + existing_count + 1)
}

pub fn ensure_transition(from: InvoiceStatus, to: InvoiceStatus) -> Result<(), InvoiceError> {
    match (from, to) {
        (InvoiceStatus::Unpaid, InvoiceStatus::Paid) | (InvoiceStatus::Unpaid, InvoiceStatus::Cancelled) => Ok(()),
        _ => Err(InvoiceError::InvalidStatusTransition { from, to }),
    }
}

/// Price a draft and check its due date against the issue date.
pub fn validate_draft(draft: &InvoiceDraft, default_tax_rate: f64, issued_date: NaiveDate) -> Result<Quote, InvoiceError> {
    let quote = quote(draft.amount, draft.tax_rate.unwrap_or(default_tax_rate))?;
    if draft.due_date < issued_date {
        return Err(InvoiceError::InvalidDueDate { issued: issued_date, due: draft.due_date });
    }
    Ok(quote)
}

pub fn build_invoice(
    professional_id: &str,
    draft: InvoiceDraft,
    default_tax_rate: f64,
    issued_date: NaiveDate,
    existing_count: usize,
) -> Result<NewInvoice, InvoiceError> {
    let quote = validate_draft(&draft, default_tax_rate, issued_date)?;

    Ok(NewInvoice {
        professional_id: professional_id.to_string(),
        patient_id: draft.patient_id,
        consultation_id: draft.consultation_id,
        invoice_number: invoice_number(issued_date.year(), existing_count),
        amount: quote.amount,
        tax_amount: quote.tax_amount,
        total_amount: quote.total_amount,
        status: InvoiceStatus::Unpaid,
        issued_date,
        due_date: draft.due_date,
        notes: draft.notes.filter(|n| !n.trim().is_empty()),
    })
}
