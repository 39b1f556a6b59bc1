use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{ConversationSummary, Message, MessagingError, NewMessage, ProfessionalPatient, SenderType};

pub fn group_by_patient(messages: &[Message]) -> HashMap<&str, Vec<&Message>> {
    let mut groups: HashMap<&str, Vec<&Message>> = HashMap::new();
    for message in messages {
        groups.entry(message.patient_id.as_str()).or_default().push(message);
    }
    groups
}

/// One summary per patient, most recent conversation first. Patients without
/// any message come last, in input order.
pub fn summarize_conversations(patients: &[ProfessionalPatient], messages: &[Message]) -> Vec<ConversationSummary> {
    let groups = group_by_patient(messages);

    let mut summaries: Vec<ConversationSummary> = patients
        .iter()
        .map(|patient| {
            let thread = groups.get(patient.id.as_str());
            let latest_message = thread
                .and_then(|msgs| msgs.iter().max_by_key(|m| m.created_at))
                .map(|m| (**m).clone());
            let unread_count = thread
                .map(|msgs| msgs.iter().filter(|m| m.is_unread_from_patient()).count())
                .unwrap_or(0);

            ConversationSummary {
                patient: patient.clone(),
                latest_message,
                unread_count,
            }
        })
        .collect();

    // stable sort keeps message-less patients in input order
    summaries.sort_by(|a, b| match (&a.latest_message, &b.latest_message) {
        (Some(x), Some(y)) => y.created_at.cmp(&x.created_at),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    summaries
}

/// Case-insensitive match on "first last".
pub fn filter_by_name(summaries: Vec<ConversationSummary>, query: &str) -> Vec<ConversationSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return summaries;
    }

    summaries
        .into_iter()
        .filter(|s| s.patient.full_name().to_lowercase().contains(&needle))
        .collect()
}

/// The conversation with one patient, oldest first.
pub fn thread(messages: &[Message], patient_id: &str) -> Vec<Message> {
    let mut thread: Vec<Message> = messages
        .iter()
        .filter(|m| m.patient_id == patient_id)
        .cloned()
        .collect();
    thread.sort_by_key(|m| m.created_at);
    thread
}

/// Flag the patient's unread messages as read; returns how many changed.
pub fn mark_thread_read(messages: &mut [Message], patient_id: &str) -> usize {
    let mut changed = 0;
    for message in messages
        .iter_mut()
        .filter(|m| m.patient_id == patient_id && m.is_unread_from_patient())
    {
        message.is_read = true;
        changed += 1;
    }
    changed
}

pub fn compose(
    professional_id: &str,
    patient_id: &str,
    content: &str,
    attachment_url: Option<String>,
) -> Result<NewMessage, MessagingError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(MessagingError::EmptyMessage);
    }

    Ok(NewMessage {
        professional_id: professional_id.to_string(),
        patient_id: patient_id.to_string(),
        sender_type: SenderType::Professional,
        content: content.to_string(),
        is_read: true,
        attachment_url,
    })
}
