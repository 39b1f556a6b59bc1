use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::BookingError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::availability::{AvailabilitySource, RandomAvailability};
use crate::services::catalog::Catalog;
use crate::services::clock::{Clock, SystemClock};
use crate::services::form::{BookingAction, BookingEvent, BookingFormController, FormView};
use crate::services::store::AppointmentStore;

/// One patient's booking form together with their appointments.
pub struct BookingSession {
    pub form: BookingFormController,
    pub store: AppointmentStore,
}

impl BookingSession {
    pub fn new(form: BookingFormController) -> Self {
        Self {
            form,
            store: AppointmentStore::new(),
        }
    }

    pub fn apply(&mut self, action: BookingAction) -> Result<BookingEvent, BookingError> {
        self.form.apply(action, &mut self.store)
    }

    /// Cancel a scheduled appointment and restart the form from its details.
    /// The cancellation stands even if no new slot is booked afterwards.
    pub fn reschedule(&mut self, id: Uuid) -> Result<FormView, BookingError> {
        let original = self
            .store
            .get(id)
            .cloned()
            .ok_or(BookingError::AppointmentNotFound(id))?;
        if !original.is_scheduled() {
            return Err(BookingError::InvalidStatusTransition {
                from: original.status,
                to: AppointmentStatus::Cancelled,
            });
        }

        self.store.cancel(id)?;
        self.form = self.form.rescheduling(&original);
        info!("Rescheduling appointment {}", id);

        Ok(self.form.view())
    }
}

/// Shared state of the booking routes: reference data, injected sources and
/// the per-user sessions.
pub struct BookingState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<Catalog>,
    availability: Arc<dyn AvailabilitySource>,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, BookingSession>>,
}

impl BookingState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let availability = Arc::new(RandomAvailability::new(config.booking.availability_ratio));
        Self::with_sources(config, Arc::new(Catalog::standard()), availability, Arc::new(SystemClock))
    }

    pub fn with_sources(
        config: Arc<AppConfig>,
        catalog: Arc<Catalog>,
        availability: Arc<dyn AvailabilitySource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            catalog,
            availability,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn new_session(&self) -> BookingSession {
        BookingSession::new(BookingFormController::new(
            self.availability.clone(),
            self.clock.clone(),
            self.catalog.clone(),
            self.config.booking.clone(),
        ))
    }

    /// Run `f` against the user's session, creating it on first use.
    pub async fn with_session<R>(&self, user_id: &str, f: impl FnOnce(&mut BookingSession) -> R) -> R {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(user_id.to_string()).or_insert_with(|| {
            debug!("Opening booking session for user {}", user_id);
            self.new_session()
        });
        f(session)
    }

    /// Read-only view of the user's appointments; empty when no session exists.
    pub async fn appointments(&self, user_id: &str) -> Vec<Appointment> {
        let sessions = self.sessions.read().await;
        sessions
            .get(user_id)
            .map(|s| s.store.list().to_vec())
            .unwrap_or_default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
