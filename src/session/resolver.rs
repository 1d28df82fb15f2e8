use crate::error::app_error::AppError;
use crate::models::role::RoleResolver;
use crate::models::session::{AuthState, AuthenticatedUser, ResolverPhase, Session, SessionEventKind};
use crate::provider::IdentityProvider;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Signup either yields an active session immediately or parks the account
/// behind an email confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum SignupOutcome {
    Active(AuthenticatedUser),
    ConfirmationRequired,
}

/// Owns the process-wide authentication state and is its only writer.
/// Readers subscribe through [`SessionResolver::subscribe`]; provider-pushed
/// session events are applied in delivery order by a single task, and a
/// liveness flag guards against applying completions after [`shutdown`].
///
/// Applying a session is idempotent: the same session twice produces the
/// same observable state.
///
/// [`shutdown`]: SessionResolver::shutdown
pub struct SessionResolver {
    provider: Arc<dyn IdentityProvider>,
    roles: Arc<dyn RoleResolver>,
    state: watch::Sender<AuthState>,
    alive: Arc<AtomicBool>,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, roles: Arc<dyn RoleResolver>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            provider,
            roles,
            state,
            alive: Arc::new(AtomicBool::new(true)),
            event_task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Transitions `Uninitialized -> Loading`, starts the event-apply task,
    /// then resolves the initial session fetch into `Authenticated` or
    /// `Unauthenticated`. Fetch errors resolve to `Unauthenticated`.
    pub async fn init(self: &Arc<Self>) {
        self.state.send_modify(|state| state.phase = ResolverPhase::Loading);

        // Subscribe before the initial fetch so no event can slip between.
        let mut events = self.provider.subscribe();
        let resolver = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(kind = ?event.kind, authenticated = event.session.is_some(), "applying provider session event");
                        if event.kind == SessionEventKind::InitialSession && resolver.state().phase != ResolverPhase::Loading {
                            // A later event already settled the state.
                            continue;
                        }
                        resolver.apply_session(event.session);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session event stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.event_task.lock().await = Some(task);

        match self.provider.get_session().await {
            Ok(session) => self.apply_session(session),
            Err(e) => {
                warn!(error = ?e, "initial session fetch failed, treating as signed out");
                self.apply_session(None);
            }
        }
    }

    /// The single state mutation point. Recomputes the derived user and role
    /// from the session; checked against the liveness flag so completions
    /// arriving after teardown never mutate state.
    fn apply_session(&self, session: Option<Session>) {
        if !self.alive.load(Ordering::SeqCst) {
            debug!("resolver torn down, dropping session update");
            return;
        }

        let user = session.as_ref().map(|s| s.user.clone());
        let role = self.roles.resolve(user.as_ref().and_then(|u| u.email.as_deref()));
        let phase = if session.is_some() {
            ResolverPhase::Authenticated
        } else {
            ResolverPhase::Unauthenticated
        };

        self.state.send_modify(|state| {
            state.phase = phase;
            state.session = session;
            state.user = user;
            state.role = role;
        });
    }

    /// Delegates to the provider; a failure surfaces exactly one classified
    /// reason. The provider's own event settles the authoritative state, but
    /// the session is also applied here so the caller observes it
    /// immediately (idempotent with the event).
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AppError> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        let user = session.user.clone();
        self.apply_session(Some(session));
        Ok(user)
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<SignupOutcome, AppError> {
        match self.provider.sign_up(email, password).await? {
            Some(session) => {
                let user = session.user.clone();
                self.apply_session(Some(session));
                Ok(SignupOutcome::Active(user))
            }
            None => Ok(SignupOutcome::ConfirmationRequired),
        }
    }

    /// Local state clears no matter what the provider says; "nothing to sign
    /// out of" is not an error worth surfacing.
    pub async fn logout(&self) {
        if let Err(e) = self.provider.sign_out().await {
            warn!(error = ?e, "provider sign-out failed, clearing local state anyway");
        }
        self.apply_session(None);
    }

    /// Returns the redirect URL that starts the external flow; completion
    /// arrives later as a `SignedIn` event.
    pub fn sign_in_with_oauth(&self, provider_name: &str, redirect_to: &str) -> Result<String, AppError> {
        self.provider.sign_in_with_oauth(provider_name, redirect_to)
    }

    /// Fire-and-forget: the outcome only ever surfaces as a notification, so
    /// failures are logged, not returned.
    pub async fn send_password_reset(&self, email: &str, redirect_to: &str) {
        if let Err(e) = self.provider.reset_password_for_email(email, redirect_to).await {
            warn!(error = ?e, "password reset request failed");
        }
    }

    /// Marks the resolver dead and stops the event task. Any in-flight
    /// completion that lands afterwards is dropped by `apply_session`.
    pub async fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
        }
    }
}
