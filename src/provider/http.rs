use crate::config::IdentityConfig;
use crate::error::app_error::{AppError, AuthFailureReason};
use crate::models::session::{AuthenticatedUser, Session, SessionEvent, SessionEventKind};
use crate::provider::IdentityProvider;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// GoTrue-style REST client for the identity provider. Holds the session it
/// was last issued and replays it from `get_session`; every successful
/// operation is also announced on the event channel.
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    api_key: String,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
    redirect_to: &'a str,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: ProviderUserMetadata,
}

#[derive(Deserialize, Default)]
struct ProviderUserMetadata {
    full_name: Option<String>,
}

/// Token-ish response body. Signup without auto-confirm returns a bare user
/// instead of a token grant, so every field is optional.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<ProviderUser>,
}

#[derive(Deserialize, Default)]
struct ProviderErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl From<ProviderUser> for AuthenticatedUser {
    fn from(user: ProviderUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.user_metadata.full_name,
        }
    }
}

/// Collapses a provider error response into exactly one user-facing reason.
fn classify_auth_error(status: StatusCode, body: &str) -> AuthFailureReason {
    let parsed: ProviderErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .unwrap_or_else(|| format!("provider returned {status}"));

    let lowered = message.to_lowercase();
    if lowered.contains("invalid login credentials") || lowered.contains("invalid credentials") {
        AuthFailureReason::InvalidCredentials
    } else if lowered.contains("not confirmed") {
        AuthFailureReason::EmailNotConfirmed
    } else if lowered.contains("validate email") || lowered.contains("invalid format") || lowered.contains("invalid email") {
        AuthFailureReason::MalformedEmail
    } else {
        AuthFailureReason::Other(message)
    }
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            current: RwLock::new(None),
            events,
        }
    }

    fn session_from_token_response(response: TokenResponse) -> Option<Session> {
        let access_token = response.access_token?;
        let refresh_token = response.refresh_token?;
        let user = response.user?;
        let expires_at = Utc::now() + Duration::seconds(response.expires_in.unwrap_or(3600));

        Some(Session {
            access_token,
            refresh_token,
            expires_at,
            user: user.into(),
        })
    }

    fn announce(&self, kind: SessionEventKind, session: Option<Session>) {
        // No subscribers yet is fine; the send just drops the event.
        let _ = self.events.send(SessionEvent { kind, session });
    }

    fn store_session(&self, session: Option<Session>) {
        if let Ok(mut current) = self.current.write() {
            *current = session;
        }
    }

    fn current_session(&self) -> Result<Option<Session>, AppError> {
        Ok(self
            .current
            .read()
            .map_err(|_| AppError::provider("session lock poisoned"))?
            .clone())
    }

    async fn post_auth(&self, path: &str, body: &impl Serialize) -> Result<TokenResponse, AppError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AuthFailed(classify_auth_error(status, &body)));
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        let current = self.current_session()?;
        self.announce(SessionEventKind::InitialSession, current.clone());
        Ok(current)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let response = self
            .post_auth("/token?grant_type=password", &PasswordGrantRequest { email, password })
            .await?;

        let session = Self::session_from_token_response(response)
            .ok_or_else(|| AppError::provider("token response missing session fields"))?;

        debug!(user_id = %session.user.id, "password sign-in succeeded");
        self.store_session(Some(session.clone()));
        self.announce(SessionEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AppError> {
        let response = self.post_auth("/signup", &PasswordGrantRequest { email, password }).await?;

        match Self::session_from_token_response(response) {
            Some(session) => {
                debug!(user_id = %session.user.id, "signup issued an active session");
                self.store_session(Some(session.clone()));
                self.announce(SessionEventKind::SignedIn, Some(session.clone()));
                Ok(Some(session))
            }
            // Bare user in the response body: confirmation email pending.
            None => Ok(None),
        }
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        // Read the cache directly; going through get_session would announce
        // a spurious InitialSession in the middle of a logout.
        let Some(session) = self.current_session()? else {
            debug!("sign-out with no active session, nothing to do");
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        // The token may already be dead server-side; local state clears
        // either way.
        if !response.status().is_success() {
            debug!(status = %response.status(), "provider rejected sign-out");
        }

        self.store_session(None);
        self.announce(SessionEventKind::SignedOut, None);
        Ok(())
    }

    fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> Result<String, AppError> {
        if provider.is_empty() {
            return Err(AppError::BadRequest("OAuth provider name must not be empty".to_string()));
        }

        Ok(format!(
            "{}/authorize?provider={}&redirect_to={}",
            self.base_url,
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to)
        ))
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(format!("{}/recover", self.base_url))
            .header("apikey", &self.api_key)
            .json(&RecoverRequest { email, redirect_to })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AuthFailed(classify_auth_error(status, &body)));
        }

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpIdentityProvider, classify_auth_error};
    use crate::config::IdentityConfig;
    use crate::error::app_error::AuthFailureReason;
    use crate::provider::IdentityProvider;
    use reqwest::StatusCode;

    #[test]
    fn invalid_credentials_are_classified() {
        let reason = classify_auth_error(StatusCode::BAD_REQUEST, r#"{"error_description":"Invalid login credentials"}"#);
        assert_eq!(reason, AuthFailureReason::InvalidCredentials);
    }

    #[test]
    fn unconfirmed_email_is_classified() {
        let reason = classify_auth_error(StatusCode::BAD_REQUEST, r#"{"msg":"Email not confirmed"}"#);
        assert_eq!(reason, AuthFailureReason::EmailNotConfirmed);
    }

    #[test]
    fn unparseable_body_falls_back_to_other() {
        let reason = classify_auth_error(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(matches!(reason, AuthFailureReason::Other(_)));
    }

    #[test]
    fn oauth_url_encodes_provider_and_redirect() {
        let provider = HttpIdentityProvider::new(&IdentityConfig {
            base_url: "https://auth.example.test/auth/v1/".to_string(),
            ..IdentityConfig::default()
        });

        let url = provider.sign_in_with_oauth("google", "https://app.example.test/callback?x=1").unwrap();
        assert_eq!(
            url,
            "https://auth.example.test/auth/v1/authorize?provider=google&redirect_to=https%3A%2F%2Fapp.example.test%2Fcallback%3Fx%3D1"
        );
    }

    #[rocket::async_test]
    async fn sign_out_does_not_announce_initial_session() {
        let provider = HttpIdentityProvider::new(&IdentityConfig::default());
        let mut events = provider.subscribe();

        // No cached session, so this returns without touching the network.
        provider.sign_out().await.unwrap();

        assert!(
            events.try_recv().is_err(),
            "sign-out must not emit session events when there is nothing to clear"
        );
    }
}
