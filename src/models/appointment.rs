use chrono::{DateTime, NaiveDate, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use std::fmt;
use validator::Validate;

/// Lifecycle of a booking record. Every appointment starts `Pending`; the
/// repository only changes it through an explicit status update validated
/// against [`AppointmentStatus::can_transition_to`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, JsonSchema)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Transition table: Pending -> {Approved, Cancelled};
    /// Approved -> {Cancelled, Completed}; Cancelled and Completed are
    /// terminal. There are no self-loops.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Cancelled) | (Approved, Cancelled) | (Approved, Completed)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "Pending"),
            AppointmentStatus::Approved => write!(f, "Approved"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// One booking record as persisted in the appointment store. Field names in
/// the stored JSON stay camelCase for compatibility with existing data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub time: String,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub booked_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct AppointmentRequest {
    #[validate(length(min = 1))]
    pub patient_name: String,
    #[validate(length(min = 1))]
    pub doctor_id: String,
    #[validate(length(min = 1))]
    pub doctor_name: String,
    #[validate(length(min = 1))]
    pub specialty: String,
    pub date: NaiveDate,
    #[validate(length(min = 1))]
    pub time: String,
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug, JsonSchema)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct AppointmentResponse {
    pub id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub time: String,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub booked_at: DateTime<Utc>,
}

impl From<&Appointment> for AppointmentResponse {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id.clone(),
            patient_name: appointment.patient_name.clone(),
            doctor_id: appointment.doctor_id.clone(),
            doctor_name: appointment.doctor_name.clone(),
            specialty: appointment.specialty.clone(),
            date: appointment.date,
            time: appointment.time.clone(),
            reason: appointment.reason.clone(),
            status: appointment.status,
            booked_at: appointment.booked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppointmentStatus::*;

    #[test]
    fn pending_may_be_approved_or_cancelled() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn approved_may_be_cancelled_or_completed() {
        assert!(Approved.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn cancelled_and_completed_are_terminal() {
        for next in [Pending, Approved, Cancelled, Completed] {
            assert!(!Cancelled.can_transition_to(next));
            assert!(!Completed.can_transition_to(next));
        }
    }

    #[test]
    fn self_transitions_are_rejected() {
        for status in [Pending, Approved, Cancelled, Completed] {
            assert!(!status.can_transition_to(status));
        }
    }
}
