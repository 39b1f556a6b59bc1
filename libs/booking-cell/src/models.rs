// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// TIME SLOTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub is_available: bool,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub address: String,
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub status: AppointmentStatus,
    pub test_type: String,
    pub kind: AppointmentKind,
    pub imaging_type: Option<ImagingModality>,
    pub center_name: Option<String>,
    pub consultation_mode: Option<ConsultationMode>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start_time < end && start < self.end_time
    }

    /// Human name of whoever the appointment is with.
    pub fn provider_label(&self) -> &str {
        self.provider_name
            .as_deref()
            .or(self.center_name.as_deref())
            .or(self.provider_id.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What is being booked. `Standard` covers lab draws done at home by a nurse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    Standard,
    Imaging,
    Telehealth,
}

impl fmt::Display for AppointmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentKind::Standard => write!(f, "standard"),
            AppointmentKind::Imaging => write!(f, "imaging"),
            AppointmentKind::Telehealth => write!(f, "telehealth"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImagingModality {
    Irm,
    Scanner,
    Radio,
}

impl ImagingModality {
    pub fn label(&self) -> &'static str {
        match self {
            ImagingModality::Irm => "IRM",
            ImagingModality::Scanner => "Scanner",
            ImagingModality::Radio => "Radiographie",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationMode {
    Video,
    InPerson,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    General,
    Cardiology,
    Dermatology,
    Pediatrics,
    Psychology,
}

impl Specialty {
    pub fn label(&self) -> &'static str {
        match self {
            Specialty::General => "Médecine générale",
            Specialty::Cardiology => "Cardiologie",
            Specialty::Dermatology => "Dermatologie",
            Specialty::Pediatrics => "Pédiatrie",
            Specialty::Psychology => "Psychologie",
        }
    }
}

// ==============================================================================
// REFERENCE DATA
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagingCenter {
    pub id: String,
    pub name: String,
    pub address: String,
    pub distance_km: f64,
    pub rating: f64,
    pub available_services: Vec<ImagingModality>,
}

impl ImagingCenter {
    pub fn offers(&self, modality: ImagingModality) -> bool {
        self.available_services.contains(&modality)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: Specialty,
    pub rating: f64,
    pub distance_km: f64,
    pub price: f64,
    pub available: bool,
    pub practice_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nurse {
    pub id: String,
    pub name: String,
    pub distance_km: f64,
    pub rating: f64,
    pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorQuery {
    pub query: Option<String>,
    pub specialty: Option<Specialty>,
    #[serde(default)]
    pub nearby_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CenterQuery {
    pub modality: Option<ImagingModality>,
}

// ==============================================================================
// BOOKING RESULTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointments: Vec<Appointment>,
    /// Selected slots that did not become appointments under the active
    /// multi-slot policy.
    pub ignored_slots: Vec<TimeSlot>,
    pub message: String,
}
