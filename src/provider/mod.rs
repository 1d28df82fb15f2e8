pub mod http;

use crate::error::app_error::AppError;
use crate::models::session::{Session, SessionEvent};
use tokio::sync::broadcast;

/// The external identity provider boundary. Opaque: retry and backoff
/// against the remote service are its business, not ours. Implementations
/// push `SessionEvent`s on the broadcast channel after their own successful
/// operations; the resolver consumes them in delivery order.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch the currently active session, if any.
    async fn get_session(&self) -> Result<Option<Session>, AppError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError>;

    /// `Ok(None)` means the account was created but requires email
    /// confirmation before a session exists.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AppError>;

    /// Signing out with no active session is a benign no-op.
    async fn sign_out(&self) -> Result<(), AppError>;

    /// Builds the redirect URL for an external OAuth flow. Completion is not
    /// observed here; it arrives later as a `SignedIn` event.
    fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> Result<String, AppError>;

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), AppError>;

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
