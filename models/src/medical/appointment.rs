// models/src/medical/appointment.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{check_max_len, require_text, ValidationError, ValidationResult};
use crate::identifiers::new_id;
use crate::medical::doctor::DoctorSummary;
use crate::medical::user::UserSummary;
use crate::schedule::parse_appointment_date;

pub const MAX_REASON_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    /// Whether an appointment in this status holds its `(doctor, date, time)`
    /// slot. Cancelled appointments release it.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    /// Statuses the reminder scans look at.
    pub fn is_upcoming(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery record written after a voice notification email went out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceNotification {
    pub sent: bool,
    pub audio_url: String,
    pub sent_at: DateTime<Utc>,
}

// --- DTO for booking requests ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NewAppointment {
    #[serde(default)]
    pub doctor: Option<String>,
    /// Defaults to the caller when absent.
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

// --- DTO for partial updates ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppointmentUpdate {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub doctor: Uuid,
    pub patient: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub voice_notification: Option<VoiceNotification>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Validates a booking request for already-resolved doctor and patient
    /// references.
    pub fn from_request(request: &NewAppointment, doctor: Uuid, patient: Uuid) -> ValidationResult<Self> {
        let date = parse_appointment_date(&request.date)?;
        let time = require_text("appointment time", &request.time)?;
        let reason = require_text("reason for the appointment", &request.reason)?;
        let now = Utc::now();
        let appointment = Appointment {
            id: new_id(),
            doctor,
            patient,
            date,
            time,
            status: request.status.unwrap_or_default(),
            reason,
            notes: request.notes.clone().filter(|n| !n.trim().is_empty()),
            voice_notification: None,
            created_at: now,
            updated_at: now,
        };
        appointment.validate()?;
        Ok(appointment)
    }

    /// Returns a copy with the update applied and re-validated.
    pub fn with_update(&self, update: &AppointmentUpdate) -> ValidationResult<Self> {
        let mut next = self.clone();
        if let Some(date) = &update.date {
            next.date = parse_appointment_date(date)?;
        }
        if let Some(time) = &update.time {
            next.time = require_text("appointment time", time)?;
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        if let Some(reason) = &update.reason {
            next.reason = require_text("reason for the appointment", reason)?;
        }
        if let Some(notes) = &update.notes {
            next.notes = Some(notes.clone()).filter(|n| !n.trim().is_empty());
        }
        next.validate()?;
        next.updated_at = Utc::now();
        Ok(next)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.time.trim().is_empty() {
            return Err(ValidationError::Required("appointment time"));
        }
        if self.reason.trim().is_empty() {
            return Err(ValidationError::Required("reason for the appointment"));
        }
        check_max_len("Reason", &self.reason, MAX_REASON_LEN)?;
        if let Some(notes) = &self.notes {
            check_max_len("Notes", notes, MAX_NOTES_LEN)?;
        }
        Ok(())
    }

    pub fn is_owned_by(&self, user: &Uuid) -> bool {
        &self.patient == user
    }
}

/// An appointment with its doctor (and the doctor's user) and patient
/// expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: Uuid,
    pub doctor: Option<DoctorSummary>,
    pub patient: Option<UserSummary>,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub voice_notification: Option<VoiceNotification>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentView {
    pub fn new(appointment: &Appointment, doctor: Option<DoctorSummary>, patient: Option<UserSummary>) -> Self {
        AppointmentView {
            id: appointment.id,
            doctor,
            patient,
            date: appointment.date,
            time: appointment.time.clone(),
            status: appointment.status,
            reason: appointment.reason.clone(),
            notes: appointment.notes.clone(),
            voice_notification: appointment.voice_notification.clone(),
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}
