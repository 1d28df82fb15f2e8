use crate::models::role::Role;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};

/// Identity principal derived from the active session. Immutable; replaced
/// wholesale whenever the provider delivers a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// One authenticated session: opaque token pair plus expiry, owned by the
/// resolver and replaced on every refresh event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthenticatedUser,
}

/// Kind of a provider-pushed session notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A provider-pushed `(kind, session-or-none)` notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

/// Lifecycle of the resolver itself, distinct from whether a user is
/// present: `Uninitialized` before `init()`, `Loading` while the initial
/// session fetch is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolverPhase {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Process-wide authentication state published by the resolver. Exactly one
/// owner mutates it; readers observe it through a watch channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthState {
    pub phase: ResolverPhase,
    pub session: Option<Session>,
    pub user: Option<AuthenticatedUser>,
    pub role: Role,
}

impl AuthState {
    pub fn loading(&self) -> bool {
        matches!(self.phase, ResolverPhase::Uninitialized | ResolverPhase::Loading)
    }
}
