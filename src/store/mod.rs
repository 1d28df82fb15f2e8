pub mod appointment;
pub mod file_slot;

use crate::error::app_error::AppError;
use crate::models::appointment::Appointment;
use std::sync::Arc;
use tracing::warn;

/// The one slot the appointment collection lives under.
pub const APPOINTMENTS_KEY: &str = "carelink.appointments";

/// Single-slot key-value storage: one key holds one JSON string. Assumes a
/// single logical writer; concurrent writers race and the last `set` wins.
#[async_trait::async_trait]
pub trait SlotStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// Persistence adapter for the appointment collection. `load` degrades to an
/// empty list on absent or malformed data; `save` surfaces failures to the
/// caller instead of swallowing them.
#[derive(Clone)]
pub struct AppointmentStore {
    slots: Arc<dyn SlotStore>,
}

impl AppointmentStore {
    pub fn new(slots: Arc<dyn SlotStore>) -> Self {
        Self { slots }
    }

    /// Returns the decoded collection, or an empty one if the slot is
    /// absent, unreadable, or holds malformed JSON. Never fails; the cause
    /// is logged and treated as "no data".
    pub async fn load(&self) -> Vec<Appointment> {
        let raw = match self.slots.get(APPOINTMENTS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = ?e, key = APPOINTMENTS_KEY, "appointment slot unreadable, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Appointment>>(&raw) {
            Ok(appointments) => appointments,
            Err(e) => {
                warn!(error = %e, key = APPOINTMENTS_KEY, "appointment slot holds malformed data, treating as empty");
                Vec::new()
            }
        }
    }

    /// Serializes the full collection and overwrites the slot.
    pub async fn save(&self, appointments: &[Appointment]) -> Result<(), AppError> {
        let encoded = serde_json::to_string(appointments).map_err(|e| AppError::serialization("Failed to encode appointments", e))?;
        self.slots.set(APPOINTMENTS_KEY, &encoded).await
    }
}
