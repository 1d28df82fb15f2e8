use crate::error::app_error::AppError;
use crate::models::appointment::{Appointment, AppointmentRequest, AppointmentStatus};
use crate::store::AppointmentStore;
use chrono::Utc;
use rand::Rng;

#[async_trait::async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn create(&self, request: &AppointmentRequest) -> Result<Appointment, AppError>;
    async fn list(&self) -> Result<Vec<Appointment>, AppError>;
    async fn update_status(&self, id: &str, new_status: AppointmentStatus) -> Result<Appointment, AppError>;
}

/// Repository over the single-slot store. Every mutation re-reads and
/// rewrites the entire collection; there is no partial-update protocol and
/// no cross-process coordination.
pub struct LocalAppointmentRepository {
    store: AppointmentStore,
}

impl LocalAppointmentRepository {
    pub fn new(store: AppointmentStore) -> Self {
        Self { store }
    }
}

/// Unique within the persisted store's lifetime with negligible collision
/// probability: current unix millis plus a random 24-bit suffix.
fn generate_appointment_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().r#gen();
    format!("{}-{:06x}", millis, suffix & 0x00ff_ffff)
}

#[async_trait::async_trait]
impl AppointmentRepository for LocalAppointmentRepository {
    async fn create(&self, request: &AppointmentRequest) -> Result<Appointment, AppError> {
        let appointment = Appointment {
            id: generate_appointment_id(),
            patient_name: request.patient_name.clone(),
            doctor_id: request.doctor_id.clone(),
            doctor_name: request.doctor_name.clone(),
            specialty: request.specialty.clone(),
            date: request.date,
            time: request.time.clone(),
            reason: request.reason.clone(),
            status: AppointmentStatus::Pending,
            booked_at: Utc::now(),
        };

        let mut appointments = self.store.load().await;
        appointments.push(appointment.clone());
        self.store.save(&appointments).await?;

        tracing::debug!(appointment_id = %appointment.id, doctor_id = %appointment.doctor_id, "appointment booked");
        Ok(appointment)
    }

    async fn list(&self) -> Result<Vec<Appointment>, AppError> {
        Ok(self.store.load().await)
    }

    async fn update_status(&self, id: &str, new_status: AppointmentStatus) -> Result<Appointment, AppError> {
        let mut appointments = self.store.load().await;

        let Some(appointment) = appointments.iter_mut().find(|a| a.id == id) else {
            return Err(AppError::NotFound(format!("Appointment {id} not found")));
        };

        if !appointment.status.can_transition_to(new_status) {
            return Err(AppError::InvalidStatusTransition {
                from: appointment.status,
                to: new_status,
            });
        }

        appointment.status = new_status;
        let updated = appointment.clone();
        self.store.save(&appointments).await?;

        tracing::debug!(appointment_id = %updated.id, status = %updated.status, "appointment status updated");
        Ok(updated)
    }
}
