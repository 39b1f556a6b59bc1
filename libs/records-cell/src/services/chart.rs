use crate::models::{ConsultationRequest, MedicalResult, NewConsultation, RecordsError, ResultSummary};

/// Most recent report first; with `abnormal_only`, keep reports that flag at
/// least one value.
pub fn summarize_results(mut results: Vec<MedicalResult>, abnormal_only: bool) -> Vec<ResultSummary> {
    results.sort_by(|a, b| b.result_date.cmp(&a.result_date));

    results
        .into_iter()
        .map(|result| ResultSummary {
            abnormal_count: result.abnormal_count(),
            result,
        })
        .filter(|summary| !abnormal_only || summary.abnormal_count > 0)
        .collect()
}

fn clean(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn compose_consultation(
    professional_id: &str,
    request: ConsultationRequest,
) -> Result<NewConsultation, RecordsError> {
    if request.patient_id.trim().is_empty() {
        return Err(RecordsError::InvalidConsultation("patient is required".to_string()));
    }

    // a follow-up date only means something when a follow-up is planned
    let followup_date = if request.followup_needed {
        match request.followup_date {
            Some(date) if date > request.date => Some(date),
            Some(_) => {
                return Err(RecordsError::InvalidConsultation(
                    "follow-up must come after the consultation".to_string(),
                ))
            }
            None => {
                return Err(RecordsError::InvalidConsultation(
                    "follow-up date is required".to_string(),
                ))
            }
        }
    } else {
        None
    };

    Ok(NewConsultation {
        professional_id: professional_id.to_string(),
        patient_id: request.patient_id.trim().to_string(),
        appointment_id: clean(request.appointment_id),
        date: request.date,
        diagnosis: clean(request.diagnosis),
        treatment: clean(request.treatment),
        prescription: clean(request.prescription),
        notes: clean(request.notes),
        followup_needed: request.followup_needed,
        followup_date,
    })
}
