use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::BookingError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::availability::BookedInterval;

/// In-memory appointment list of one booking session, newest first.
#[derive(Debug, Default, Clone)]
pub struct AppointmentStore {
    appointments: Vec<Appointment>,
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    /// Fails when a provider (nurse, doctor or imaging center) would hold two
    /// overlapping scheduled appointments.
    pub fn check_conflict(&self, candidate: &Appointment) -> Result<(), BookingError> {
        let Some(provider) = candidate.provider_id.as_deref() else {
            return Ok(());
        };
        if !candidate.is_scheduled() {
            return Ok(());
        }

        let clash = self.appointments.iter().any(|existing| {
            existing.id != candidate.id
                && existing.is_scheduled()
                && existing.provider_id.as_deref() == Some(provider)
                && existing.overlaps(candidate.start_time, candidate.end_time)
        });

        if clash {
            warn!("Rejecting double booking of {} at {}", provider, candidate.start_time);
            return Err(BookingError::SlotConflict {
                provider: candidate.provider_label().to_string(),
                start: candidate.start_time,
            });
        }

        Ok(())
    }

    pub fn add(&mut self, appointment: Appointment) -> Result<(), BookingError> {
        self.check_conflict(&appointment)?;

        debug!("Adding appointment {} ({})", appointment.id, appointment.test_type);
        self.appointments.insert(0, appointment);
        Ok(())
    }

    /// Flip a scheduled appointment to cancelled. Unknown ids are ignored.
    pub fn cancel(&mut self, id: Uuid) -> Result<Option<&Appointment>, BookingError> {
        let Some(pos) = self.appointments.iter().position(|a| a.id == id) else {
            debug!("Cancel requested for unknown appointment {}", id);
            return Ok(None);
        };

        let appointment = &mut self.appointments[pos];
        match appointment.status {
            AppointmentStatus::Scheduled => {
                appointment.status = AppointmentStatus::Cancelled;
                info!("Appointment {} cancelled", id);
            }
            AppointmentStatus::Cancelled => {}
            AppointmentStatus::Completed => {
                return Err(BookingError::InvalidStatusTransition {
                    from: AppointmentStatus::Completed,
                    to: AppointmentStatus::Cancelled,
                });
            }
        }

        Ok(Some(&self.appointments[pos]))
    }

    pub fn complete(&mut self, id: Uuid) -> Result<&Appointment, BookingError> {
        let appointment = self
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(BookingError::AppointmentNotFound(id))?;

        if appointment.status != AppointmentStatus::Scheduled {
            return Err(BookingError::InvalidStatusTransition {
                from: appointment.status,
                to: AppointmentStatus::Completed,
            });
        }

        appointment.status = AppointmentStatus::Completed;
        info!("Appointment {} completed", id);
        Ok(appointment)
    }

    /// Scheduled appointments, soonest first.
    pub fn upcoming(&self) -> Vec<&Appointment> {
        let mut upcoming: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.is_scheduled())
            .collect();
        upcoming.sort_by_key(|a| a.start_time);
        upcoming
    }

    pub fn past(&self) -> Vec<&Appointment> {
        self.appointments
            .iter()
            .filter(|a| matches!(a.status, AppointmentStatus::Completed | AppointmentStatus::Cancelled))
            .collect()
    }

    pub fn booked_intervals(&self) -> Vec<BookedInterval> {
        self.appointments
            .iter()
            .filter(|a| a.is_scheduled())
            .filter_map(|a| {
                a.provider_id.as_ref().map(|provider| BookedInterval {
                    provider: provider.clone(),
                    start: a.start_time,
                    end: a.end_time,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentKind;
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveDate, Utc};

    fn appointment(provider_id: Option<&str>, hour: u32) -> Appointment {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let start_time = date.and_hms_opt(hour, 0, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            date,
            start_time,
            end_time: start_time + Duration::minutes(30),
            address: "123 Rue Principale, Ville".to_string(),
            provider_id: provider_id.map(str::to_string),
            provider_name: provider_id.map(|id| format!("Provider {}", id)),
            status: AppointmentStatus::Scheduled,
            test_type: "Bilan Lipidique".to_string(),
            kind: AppointmentKind::Standard,
            imaging_type: None,
            center_name: None,
            consultation_mode: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_prepends() {
        let mut store = AppointmentStore::new();
        let first = appointment(None, 9);
        let second = appointment(None, 10);
        let (first_id, second_id) = (first.id, second.id);

        store.add(first).unwrap();
        store.add(second).unwrap();

        assert_eq!(store.list()[0].id, second_id);
        assert_eq!(store.list()[1].id, first_id);
    }

    #[test]
    fn test_cancel_flips_only_target() {
        let mut store = AppointmentStore::new();
        let keep = appointment(None, 9);
        let target = appointment(None, 10);
        let (keep_id, target_id) = (keep.id, target.id);
        store.add(keep).unwrap();
        store.add(target).unwrap();

        let cancelled = store.cancel(target_id).unwrap().unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(store.get(keep_id).unwrap().status, AppointmentStatus::Scheduled);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_cancel_unknown_is_noop() {
        let mut store = AppointmentStore::new();
        store.add(appointment(None, 9)).unwrap();

        assert!(store.cancel(Uuid::new_v4()).unwrap().is_none());
        assert_eq!(store.list()[0].status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn test_cancel_completed_is_rejected() {
        let mut store = AppointmentStore::new();
        let a = appointment(None, 9);
        let id = a.id;
        store.add(a).unwrap();
        store.complete(id).unwrap();

        assert_matches!(store.cancel(id), Err(BookingError::InvalidStatusTransition { .. }));
        assert_matches!(store.complete(id), Err(BookingError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_provider_cannot_be_double_booked() {
        let mut store = AppointmentStore::new();
        store.add(appointment(Some("doc-1"), 9)).unwrap();

        assert_matches!(
            store.add(appointment(Some("doc-1"), 9)),
            Err(BookingError::SlotConflict { .. })
        );
        // another provider, or no named provider, is fine
        store.add(appointment(Some("doc-2"), 9)).unwrap();
        store.add(appointment(None, 9)).unwrap();
    }

    #[test]
    fn test_imaging_center_cannot_be_double_booked() {
        let mut store = AppointmentStore::new();
        let mut first = appointment(Some("center-1"), 9);
        first.kind = AppointmentKind::Imaging;
        first.provider_name = None;
        first.center_name = Some("Centre d'Imagerie Paris Est".to_string());
        let mut second = first.clone();
        second.id = Uuid::new_v4();

        store.add(first).unwrap();
        assert_matches!(
            store.add(second),
            Err(BookingError::SlotConflict { provider, .. }) => assert_eq!(provider, "Centre d'Imagerie Paris Est")
        );
        assert_eq!(store.booked_intervals()[0].provider, "center-1");
    }

    #[test]
    fn test_cancelled_booking_frees_provider() {
        let mut store = AppointmentStore::new();
        let first = appointment(Some("nurse-1"), 9);
        let id = first.id;
        store.add(first).unwrap();
        store.cancel(id).unwrap();

        store.add(appointment(Some("nurse-1"), 9)).unwrap();
        assert_eq!(store.booked_intervals().len(), 1);
    }

    #[test]
    fn test_upcoming_and_past_partition() {
        let mut store = AppointmentStore::new();
        let late = appointment(None, 14);
        let early = appointment(None, 8);
        let done = appointment(None, 10);
        let (late_id, early_id, done_id) = (late.id, early.id, done.id);
        store.add(late).unwrap();
        store.add(early).unwrap();
        store.add(done).unwrap();
        store.complete(done_id).unwrap();

        let upcoming: Vec<Uuid> = store.upcoming().iter().map(|a| a.id).collect();
        assert_eq!(upcoming, vec![early_id, late_id]);
        assert_eq!(store.past().len(), 1);
        assert_eq!(store.past()[0].id, done_id);
    }
}
