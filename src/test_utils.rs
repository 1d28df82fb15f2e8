use crate::error::app_error::{AppError, AuthFailureReason};
use crate::models::appointment::AppointmentRequest;
use crate::models::role::EmailSubstringRoles;
use crate::models::session::{AuthenticatedUser, Session, SessionEvent, SessionEventKind};
use crate::provider::IdentityProvider;
use crate::session::resolver::SessionResolver;
use crate::store::appointment::{AppointmentRepository, LocalAppointmentRepository};
use crate::store::{AppointmentStore, SlotStore};
use chrono::{Duration, NaiveDate, Utc};
use rocket::{Build, Rocket, catchers};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// In-memory slot store; `fail_writes` turns every `set` into an I/O error
/// so save-failure propagation can be exercised.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
    write_failure: AtomicBool,
}

impl MemorySlotStore {
    pub fn fail_writes(&self, fail: bool) {
        self.write_failure.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SlotStore for MemorySlotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.slots.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        if self.write_failure.load(Ordering::SeqCst) {
            return Err(AppError::storage("Simulated write failure", std::io::Error::other("injected")));
        }
        self.slots.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub fn session_for(email: &str) -> Session {
    Session {
        access_token: format!("token-{email}"),
        refresh_token: format!("refresh-{email}"),
        expires_at: Utc::now() + Duration::hours(1),
        user: AuthenticatedUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            display_name: None,
        },
    }
}

/// Scripted identity provider. Issues `token-<email>` sessions, can fail the
/// next auth call with a given reason, and can be switched into
/// confirmation-required signup mode.
pub struct MockIdentityProvider {
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    fail_next: Mutex<Option<AuthFailureReason>>,
    confirmation_required: AtomicBool,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            session: Mutex::new(None),
            events,
            fail_next: Mutex::new(None),
            confirmation_required: AtomicBool::new(false),
        }
    }
}

impl MockIdentityProvider {
    pub fn fail_next_auth(&self, reason: AuthFailureReason) {
        *self.fail_next.lock().unwrap() = Some(reason);
    }

    pub fn require_confirmation(&self, required: bool) {
        self.confirmation_required.store(required, Ordering::SeqCst);
    }

    /// Pushes a provider event and yields long enough for the resolver's
    /// event task to apply it.
    pub async fn push_event(&self, kind: SessionEventKind, session: Option<Session>) {
        let _ = self.events.send(SessionEvent { kind, session });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    fn take_failure(&self) -> Option<AuthFailureReason> {
        self.fail_next.lock().unwrap().take()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, AppError> {
        if let Some(reason) = self.take_failure() {
            return Err(AppError::AuthFailed(reason));
        }

        let session = session_for(email);
        *self.session.lock().unwrap() = Some(session.clone());
        let _ = self.events.send(SessionEvent {
            kind: SessionEventKind::SignedIn,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<Option<Session>, AppError> {
        if let Some(reason) = self.take_failure() {
            return Err(AppError::AuthFailed(reason));
        }

        if self.confirmation_required.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let session = session_for(email);
        *self.session.lock().unwrap() = Some(session.clone());
        let _ = self.events.send(SessionEvent {
            kind: SessionEventKind::SignedIn,
            session: Some(session.clone()),
        });
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        if let Some(reason) = self.take_failure() {
            return Err(AppError::AuthFailed(reason));
        }

        *self.session.lock().unwrap() = None;
        let _ = self.events.send(SessionEvent {
            kind: SessionEventKind::SignedOut,
            session: None,
        });
        Ok(())
    }

    fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> Result<String, AppError> {
        Ok(format!(
            "https://auth.clinic.test/authorize?provider={}&redirect_to={}",
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to)
        ))
    }

    async fn reset_password_for_email(&self, _email: &str, _redirect_to: &str) -> Result<(), AppError> {
        if let Some(reason) = self.take_failure() {
            return Err(AppError::AuthFailed(reason));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

pub fn sample_appointment_request() -> AppointmentRequest {
    AppointmentRequest {
        patient_name: "Jane".to_string(),
        doctor_id: "d1".to_string(),
        doctor_name: "Dr. X".to_string(),
        specialty: "Cardiology".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        time: "09:00 AM".to_string(),
        reason: None,
    }
}

/// A fully wired rocket over mocks: in-memory appointment storage and the
/// scripted identity provider, mounted at `/api` without tracing or CORS.
pub async fn test_rocket() -> (Rocket<Build>, Arc<MockIdentityProvider>) {
    let provider = Arc::new(MockIdentityProvider::default());
    let resolver = Arc::new(SessionResolver::new(provider.clone(), Arc::new(EmailSubstringRoles)));
    resolver.init().await;

    let repository: Arc<dyn AppointmentRepository> =
        Arc::new(LocalAppointmentRepository::new(AppointmentStore::new(Arc::new(MemorySlotStore::default()))));

    let rocket = crate::mount_api_routes(rocket::build(), "/api", false)
        .manage(crate::Config::default())
        .manage(repository)
        .manage(resolver)
        .register(
            "/api",
            catchers![
                crate::routes::error::unauthorized,
                crate::routes::error::not_found,
                crate::routes::error::conflict
            ],
        );

    (rocket, provider)
}
