use std::fmt;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::{BookingSettings, MultiSlotPolicy};

use crate::error::BookingError;
use crate::models::{
    Appointment, AppointmentKind, AppointmentStatus, BookingConfirmation, ConsultationMode,
    ImagingModality, Specialty, TimeSlot,
};
use crate::services::availability::{AvailabilitySource, BookedAvailability};
use crate::services::catalog::Catalog;
use crate::services::clock::Clock;
use crate::services::selector::{SelectionOutcome, SlotSelector};
use crate::services::slots::SlotGenerator;
use crate::services::store::AppointmentStore;

pub const VIDEO_CONSULTATION_ADDRESS: &str = "Téléconsultation vidéo";
pub const UNASSIGNED_NURSE_LABEL: &str = "Infirmier disponible";

// ==============================================================================
// FORM STATE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    SelectingType,
    SelectingSubtype,
    SelectingDate,
    SelectingSlot,
    Confirmed,
}

impl fmt::Display for BookingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStep::SelectingType => write!(f, "selecting the appointment type"),
            BookingStep::SelectingSubtype => write!(f, "selecting the appointment details"),
            BookingStep::SelectingDate => write!(f, "selecting a date"),
            BookingStep::SelectingSlot => write!(f, "selecting time slots"),
            BookingStep::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// Selections accumulated before confirm.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingDraft {
    pub kind: Option<AppointmentKind>,
    pub test_type: Option<String>,
    pub nurse_id: Option<String>,
    pub address: Option<String>,
    pub modality: Option<ImagingModality>,
    pub center_id: Option<String>,
    pub specialty: Option<Specialty>,
    pub doctor_id: Option<String>,
    pub mode: Option<ConsultationMode>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BookingAction {
    ChooseType { kind: AppointmentKind },
    ChooseTest { test_type: String },
    ChooseNurse { nurse_id: Option<String> },
    SetAddress { address: String },
    ChooseModality { modality: ImagingModality },
    ChooseCenter { center_id: String },
    ChooseSpecialty { specialty: Option<Specialty> },
    ChooseDoctor { doctor_id: String },
    ChooseMode { mode: ConsultationMode },
    Continue,
    ChooseDate { date: NaiveDate },
    ToggleSlot { slot_id: String },
    Confirm,
    Back,
    Reset,
}

impl BookingAction {
    pub fn name(&self) -> &'static str {
        match self {
            BookingAction::ChooseType { .. } => "choose_type",
            BookingAction::ChooseTest { .. } => "choose_test",
            BookingAction::ChooseNurse { .. } => "choose_nurse",
            BookingAction::SetAddress { .. } => "set_address",
            BookingAction::ChooseModality { .. } => "choose_modality",
            BookingAction::ChooseCenter { .. } => "choose_center",
            BookingAction::ChooseSpecialty { .. } => "choose_specialty",
            BookingAction::ChooseDoctor { .. } => "choose_doctor",
            BookingAction::ChooseMode { .. } => "choose_mode",
            BookingAction::Continue => "continue",
            BookingAction::ChooseDate { .. } => "choose_date",
            BookingAction::ToggleSlot { .. } => "toggle_slot",
            BookingAction::Confirm => "confirm",
            BookingAction::Back => "back",
            BookingAction::Reset => "reset",
        }
    }
}

/// What applying an action produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    Updated { step: BookingStep },
    SlotToggled { slot_id: String, result: SelectionOutcome },
    Confirmed { confirmation: BookingConfirmation },
}

/// Snapshot of the form for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub step: BookingStep,
    pub draft: BookingDraft,
    pub slots: Vec<TimeSlot>,
    pub selected_slot_ids: Vec<String>,
    pub max_selections: usize,
    pub can_confirm: bool,
}

/// Resolved provider details for the appointment being built.
struct ProviderDetails {
    provider_id: Option<String>,
    provider_name: Option<String>,
    address: String,
    test_type: String,
    center_name: Option<String>,
}

// ==============================================================================
// CONTROLLER
// ==============================================================================

/// Step state machine of one patient's booking form.
pub struct BookingFormController {
    availability: Arc<dyn AvailabilitySource>,
    clock: Arc<dyn Clock>,
    catalog: Arc<Catalog>,
    settings: BookingSettings,
    step: BookingStep,
    draft: BookingDraft,
    slots: Vec<TimeSlot>,
    selector: SlotSelector,
}

impl BookingFormController {
    pub fn new(
        availability: Arc<dyn AvailabilitySource>,
        clock: Arc<dyn Clock>,
        catalog: Arc<Catalog>,
        settings: BookingSettings,
    ) -> Self {
        let selector = SlotSelector::new(settings.single_max_selections);
        Self {
            availability,
            clock,
            catalog,
            settings,
            step: BookingStep::SelectingType,
            draft: BookingDraft::default(),
            slots: Vec::new(),
            selector,
        }
    }

    /// Fresh controller sharing this one's sources, pre-filled from an
    /// existing appointment and positioned at date selection.
    pub fn rescheduling(&self, appointment: &Appointment) -> Self {
        let mut form = Self::new(
            self.availability.clone(),
            self.clock.clone(),
            self.catalog.clone(),
            self.settings.clone(),
        );
        form.prefill_from(appointment);
        form
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn selected(&self) -> &[TimeSlot] {
        self.selector.selected()
    }

    pub fn can_confirm(&self) -> bool {
        self.step == BookingStep::SelectingSlot && !self.selector.is_empty()
    }

    pub fn view(&self) -> FormView {
        FormView {
            step: self.step,
            draft: self.draft.clone(),
            slots: self.slots.clone(),
            selected_slot_ids: self.selector.selected_ids(),
            max_selections: self.selector.max_selections(),
            can_confirm: self.can_confirm(),
        }
    }

    /// Apply one user action. A failed action leaves the form untouched.
    pub fn apply(
        &mut self,
        action: BookingAction,
        store: &mut AppointmentStore,
    ) -> Result<BookingEvent, BookingError> {
        debug!("Applying booking action {} at step {:?}", action.name(), self.step);
        let name = action.name();

        let result = match action {
            BookingAction::ChooseType { kind } => self.choose_type(kind),
            BookingAction::ChooseTest { test_type } => self.choose_test(test_type),
            BookingAction::ChooseNurse { nurse_id } => self.choose_nurse(nurse_id),
            BookingAction::SetAddress { address } => self.set_address(address),
            BookingAction::ChooseModality { modality } => self.choose_modality(modality),
            BookingAction::ChooseCenter { center_id } => self.choose_center(center_id),
            BookingAction::ChooseSpecialty { specialty } => self.choose_specialty(specialty),
            BookingAction::ChooseDoctor { doctor_id } => self.choose_doctor(doctor_id),
            BookingAction::ChooseMode { mode } => self.choose_mode(mode),
            BookingAction::Continue => self.continue_to_date(),
            BookingAction::ChooseDate { date } => self.choose_date(date, store),
            BookingAction::ToggleSlot { slot_id } => self.toggle_slot(slot_id),
            BookingAction::Confirm => self.confirm(store),
            BookingAction::Back => self.back(),
            BookingAction::Reset => {
                self.reset();
                Ok(self.updated())
            }
        };

        if let Err(e) = &result {
            warn!("Booking action {} rejected: {}", name, e);
        }
        result
    }

    pub fn reset(&mut self) {
        self.step = BookingStep::SelectingType;
        self.draft = BookingDraft::default();
        self.slots.clear();
        self.selector = SlotSelector::new(self.settings.single_max_selections);
    }

    /// Load kind and sub-type choices from an appointment and jump to date
    /// selection.
    pub fn prefill_from(&mut self, appointment: &Appointment) {
        self.reset();
        self.draft.kind = Some(appointment.kind);

        match appointment.kind {
            AppointmentKind::Standard => {
                self.draft.test_type = Some(appointment.test_type.clone());
                self.draft.nurse_id = appointment
                    .provider_id
                    .clone()
                    .filter(|id| self.catalog.find_nurse(id).is_some());
                self.draft.address = Some(appointment.address.clone());
            }
            AppointmentKind::Imaging => {
                self.draft.modality = appointment.imaging_type;
                self.draft.center_id = appointment.provider_id.clone();
            }
            AppointmentKind::Telehealth => {
                if let Some(doctor) = appointment
                    .provider_id
                    .as_deref()
                    .and_then(|id| self.catalog.find_doctor(id))
                {
                    self.draft.specialty = Some(doctor.specialty);
                    self.draft.doctor_id = Some(doctor.id.clone());
                }
                self.draft.mode = appointment.consultation_mode.or(Some(ConsultationMode::Video));
            }
        }

        self.selector = SlotSelector::new(self.max_selections_for(appointment.kind));
        self.step = BookingStep::SelectingDate;
    }

    fn updated(&self) -> BookingEvent {
        BookingEvent::Updated { step: self.step }
    }

    fn require_step(&self, action: &'static str, allowed: &[BookingStep]) -> Result<(), BookingError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(BookingError::InvalidAction { action, step: self.step })
        }
    }

    fn require_subtype_of(&self, action: &'static str, kind: AppointmentKind) -> Result<(), BookingError> {
        self.require_step(action, &[BookingStep::SelectingSubtype])?;
        if self.draft.kind != Some(kind) {
            return Err(BookingError::InvalidAction { action, step: self.step });
        }
        Ok(())
    }

    fn kind(&self) -> Result<AppointmentKind, BookingError> {
        self.draft
            .kind
            .ok_or_else(|| BookingError::ValidationError("Choose an appointment type first".to_string()))
    }

    fn max_selections_for(&self, kind: AppointmentKind) -> usize {
        match kind {
            AppointmentKind::Standard => self.settings.lab_max_selections,
            AppointmentKind::Imaging | AppointmentKind::Telehealth => self.settings.single_max_selections,
        }
    }

    fn choose_type(&mut self, kind: AppointmentKind) -> Result<BookingEvent, BookingError> {
        self.require_step("choose_type", &[BookingStep::SelectingType])?;

        self.draft = BookingDraft {
            kind: Some(kind),
            ..Default::default()
        };
        match kind {
            AppointmentKind::Standard => {
                self.draft.test_type = self.catalog.default_test().map(str::to_string);
            }
            AppointmentKind::Imaging => self.draft.modality = Some(ImagingModality::Irm),
            AppointmentKind::Telehealth => self.draft.mode = Some(ConsultationMode::Video),
        }

        self.selector = SlotSelector::new(self.max_selections_for(kind));
        self.step = BookingStep::SelectingSubtype;
        Ok(self.updated())
    }

    fn choose_test(&mut self, test_type: String) -> Result<BookingEvent, BookingError> {
        self.require_subtype_of("choose_test", AppointmentKind::Standard)?;
        if !self.catalog.has_test(&test_type) {
            return Err(BookingError::UnknownReference { kind: "test type", id: test_type });
        }

        self.draft.test_type = Some(test_type);
        Ok(self.updated())
    }

    fn choose_nurse(&mut self, nurse_id: Option<String>) -> Result<BookingEvent, BookingError> {
        self.require_subtype_of("choose_nurse", AppointmentKind::Standard)?;
        if let Some(id) = &nurse_id {
            if self.catalog.find_nurse(id).is_none() {
                return Err(BookingError::UnknownReference { kind: "nurse", id: id.clone() });
            }
        }

        self.draft.nurse_id = nurse_id;
        Ok(self.updated())
    }

    fn set_address(&mut self, address: String) -> Result<BookingEvent, BookingError> {
        self.require_subtype_of("set_address", AppointmentKind::Standard)?;
        let address = address.trim();
        if address.is_empty() {
            return Err(BookingError::ValidationError("Address cannot be empty".to_string()));
        }

        self.draft.address = Some(address.to_string());
        Ok(self.updated())
    }

    fn choose_modality(&mut self, modality: ImagingModality) -> Result<BookingEvent, BookingError> {
        self.require_subtype_of("choose_modality", AppointmentKind::Imaging)?;

        self.draft.modality = Some(modality);
        self.draft.center_id = None;
        Ok(self.updated())
    }

    fn choose_center(&mut self, center_id: String) -> Result<BookingEvent, BookingError> {
        self.require_subtype_of("choose_center", AppointmentKind::Imaging)?;
        let modality = self
            .draft
            .modality
            .ok_or_else(|| BookingError::ValidationError("Choose an imaging type first".to_string()))?;
        let center = self
            .catalog
            .find_center(&center_id)
            .ok_or_else(|| BookingError::UnknownReference { kind: "imaging center", id: center_id.clone() })?;
        if !center.offers(modality) {
            return Err(BookingError::ValidationError(format!(
                "{} does not offer {}",
                center.name,
                modality.label()
            )));
        }

        self.draft.center_id = Some(center_id);
        Ok(self.updated())
    }

    fn choose_specialty(&mut self, specialty: Option<Specialty>) -> Result<BookingEvent, BookingError> {
        self.require_subtype_of("choose_specialty", AppointmentKind::Telehealth)?;

        let doctor_matches = match (specialty, self.draft.doctor_id.as_deref()) {
            (Some(s), Some(id)) => self.catalog.find_doctor(id).map_or(false, |d| d.specialty == s),
            _ => true,
        };
        if !doctor_matches {
            self.draft.doctor_id = None;
        }
        self.draft.specialty = specialty;
        Ok(self.updated())
    }

    fn choose_doctor(&mut self, doctor_id: String) -> Result<BookingEvent, BookingError> {
        self.require_subtype_of("choose_doctor", AppointmentKind::Telehealth)?;
        let doctor = self
            .catalog
            .find_doctor(&doctor_id)
            .ok_or_else(|| BookingError::UnknownReference { kind: "doctor", id: doctor_id.clone() })?;
        if let Some(specialty) = self.draft.specialty {
            if doctor.specialty != specialty {
                return Err(BookingError::ValidationError(format!(
                    "{} is not in {}",
                    doctor.name,
                    specialty.label()
                )));
            }
        }

        self.draft.doctor_id = Some(doctor_id);
        Ok(self.updated())
    }

    fn choose_mode(&mut self, mode: ConsultationMode) -> Result<BookingEvent, BookingError> {
        self.require_subtype_of("choose_mode", AppointmentKind::Telehealth)?;

        self.draft.mode = Some(mode);
        Ok(self.updated())
    }

    fn continue_to_date(&mut self) -> Result<BookingEvent, BookingError> {
        self.require_step("continue", &[BookingStep::SelectingSubtype])?;
        self.provider_details()?;

        self.step = BookingStep::SelectingDate;
        Ok(self.updated())
    }

    fn choose_date(&mut self, date: NaiveDate, store: &AppointmentStore) -> Result<BookingEvent, BookingError> {
        self.require_step("choose_date", &[BookingStep::SelectingDate, BookingStep::SelectingSlot])?;

        let now = self.clock.now();
        let today = now.date();
        let horizon_days = self.settings.horizon_days;
        // a horizon past the calendar's end leaves the window open-ended
        let beyond_horizon = today
            .checked_add_signed(Duration::days(i64::from(horizon_days)))
            .is_some_and(|limit| date >= limit);
        if date < today || beyond_horizon {
            return Err(BookingError::DateOutOfRange { date, horizon_days });
        }

        let provider = self.provider_details()?.provider_id;
        let availability = BookedAvailability::new(&*self.availability, store.booked_intervals());
        let mut slots = SlotGenerator::new(&availability).generate_for(date, provider.as_deref());
        for slot in slots.iter_mut().filter(|s| s.start_time <= now) {
            slot.is_available = false;
        }

        self.slots = slots;
        self.selector.clear();
        self.draft.date = Some(date);
        self.step = BookingStep::SelectingSlot;
        Ok(self.updated())
    }

    fn toggle_slot(&mut self, slot_id: String) -> Result<BookingEvent, BookingError> {
        self.require_step("toggle_slot", &[BookingStep::SelectingSlot])?;
        let slot = self
            .slots
            .iter()
            .find(|s| s.id == slot_id)
            .ok_or_else(|| BookingError::SlotNotFound(slot_id.clone()))?;

        let result = self.selector.toggle(slot);
        Ok(BookingEvent::SlotToggled { slot_id, result })
    }

    fn confirm(&mut self, store: &mut AppointmentStore) -> Result<BookingEvent, BookingError> {
        self.require_step("confirm", &[BookingStep::SelectingSlot])?;
        if self.selector.is_empty() {
            return Err(BookingError::NothingSelected);
        }

        let now = self.clock.now();
        if let Some(stale) = self.selector.selected().iter().find(|s| s.start_time <= now) {
            return Err(BookingError::SlotExpired(stale.id.clone()));
        }

        let kind = self.kind()?;
        let details = self.provider_details()?;
        let selected = self.selector.selected();

        let (booked, ignored) = match self.settings.multi_slot_policy {
            MultiSlotPolicy::FirstSlot => selected.split_at(1),
            MultiSlotPolicy::EachSlot => selected.split_at(selected.len()),
        };

        let appointments: Vec<Appointment> = booked
            .iter()
            .map(|slot| self.build_appointment(kind, &details, slot))
            .collect();

        // all or nothing
        for appointment in &appointments {
            store.check_conflict(appointment)?;
        }
        for appointment in &appointments {
            store.add(appointment.clone())?;
        }

        let ignored_slots = ignored.to_vec();
        let message = confirmation_message(&appointments, ignored_slots.len());
        info!(
            "Booked {} {} appointment(s), {} slot(s) ignored",
            appointments.len(),
            kind,
            ignored_slots.len()
        );

        self.step = BookingStep::Confirmed;
        let confirmation = BookingConfirmation {
            appointments,
            ignored_slots,
            message,
        };
        self.reset();

        Ok(BookingEvent::Confirmed { confirmation })
    }

    fn back(&mut self) -> Result<BookingEvent, BookingError> {
        self.step = match self.step {
            BookingStep::SelectingType | BookingStep::Confirmed => {
                return Err(BookingError::InvalidAction { action: "back", step: self.step });
            }
            BookingStep::SelectingSubtype => BookingStep::SelectingType,
            BookingStep::SelectingDate => BookingStep::SelectingSubtype,
            BookingStep::SelectingSlot => {
                self.slots.clear();
                self.selector.clear();
                self.draft.date = None;
                BookingStep::SelectingDate
            }
        };
        Ok(self.updated())
    }

    /// Check the draft's sub-type is complete and resolve it against the
    /// catalog.
    fn provider_details(&self) -> Result<ProviderDetails, BookingError> {
        match self.kind()? {
            AppointmentKind::Standard => {
                let test_type = self
                    .draft
                    .test_type
                    .clone()
                    .ok_or_else(|| BookingError::ValidationError("Choose a test type".to_string()))?;
                let nurse = self.draft.nurse_id.as_deref().and_then(|id| self.catalog.find_nurse(id));
                Ok(ProviderDetails {
                    provider_id: nurse.map(|n| n.id.clone()),
                    provider_name: nurse.map(|n| n.name.clone()),
                    address: self
                        .draft
                        .address
                        .clone()
                        .unwrap_or_else(|| self.settings.default_address.clone()),
                    test_type,
                    center_name: None,
                })
            }
            AppointmentKind::Imaging => {
                let modality = self
                    .draft
                    .modality
                    .ok_or_else(|| BookingError::ValidationError("Choose an imaging type".to_string()))?;
                let center = self
                    .draft
                    .center_id
                    .as_deref()
                    .and_then(|id| self.catalog.find_center(id))
                    .ok_or_else(|| BookingError::ValidationError("Choose an imaging center".to_string()))?;
                Ok(ProviderDetails {
                    provider_id: Some(center.id.clone()),
                    provider_name: None,
                    address: center.address.clone(),
                    test_type: modality.label().to_string(),
                    center_name: Some(center.name.clone()),
                })
            }
            AppointmentKind::Telehealth => {
                let doctor = self
                    .draft
                    .doctor_id
                    .as_deref()
                    .and_then(|id| self.catalog.find_doctor(id))
                    .ok_or_else(|| BookingError::ValidationError("Choose a doctor".to_string()))?;
                let mode = self.draft.mode.unwrap_or(ConsultationMode::Video);
                Ok(ProviderDetails {
                    provider_id: Some(doctor.id.clone()),
                    provider_name: Some(doctor.name.clone()),
                    address: match mode {
                        ConsultationMode::Video => VIDEO_CONSULTATION_ADDRESS.to_string(),
                        ConsultationMode::InPerson => doctor.practice_address.clone(),
                    },
                    test_type: format!("Consultation {}", doctor.specialty.label()),
                    center_name: None,
                })
            }
        }
    }

    fn build_appointment(&self, kind: AppointmentKind, details: &ProviderDetails, slot: &TimeSlot) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            date: slot.start_time.date(),
            start_time: slot.start_time,
            end_time: slot.end_time,
            address: details.address.clone(),
            provider_id: details.provider_id.clone(),
            provider_name: details.provider_name.clone(),
            status: AppointmentStatus::Scheduled,
            test_type: details.test_type.clone(),
            kind,
            imaging_type: match kind {
                AppointmentKind::Imaging => self.draft.modality,
                _ => None,
            },
            center_name: details.center_name.clone(),
            consultation_mode: match kind {
                AppointmentKind::Telehealth => Some(self.draft.mode.unwrap_or(ConsultationMode::Video)),
                _ => None,
            },
            created_at: Utc::now(),
        }
    }
}

fn confirmation_message(appointments: &[Appointment], ignored: usize) -> String {
    let Some(first) = appointments.first() else {
        return String::new();
    };

    let with = match (&first.provider_name, &first.center_name, first.kind) {
        (Some(name), _, _) => name.clone(),
        (None, Some(center), _) => center.clone(),
        (None, None, AppointmentKind::Standard) => UNASSIGNED_NURSE_LABEL.to_string(),
        (None, None, _) => String::new(),
    };

    let mut message = format!(
        "{} booked on {} at {} with {}",
        first.test_type,
        first.date.format("%d/%m/%Y"),
        first.start_time.format("%H:%M"),
        with
    );
    if appointments.len() > 1 {
        message.push_str(&format!(" (+{} more)", appointments.len() - 1));
    }
    if ignored > 0 {
        message.push_str(&format!("; {} extra slot(s) were not booked", ignored));
    }
    message
}
