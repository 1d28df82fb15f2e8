use crate::models::role::Role;
use crate::models::session::AuthenticatedUser;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use validator::Validate;

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct OAuthRequest {
    /// External OAuth provider name, e.g. "google" or "github".
    #[validate(length(min = 1))]
    pub provider: String,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<&AuthenticatedUser> for UserResponse {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub role: Role,
}

/// Signup either activates a session immediately or sends a confirmation
/// email; the latter is informational, not an error.
#[derive(Serialize, Debug, JsonSchema)]
pub struct SignupResponse {
    pub message: String,
    pub user: Option<UserResponse>,
    pub role: Role,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct OAuthRedirectResponse {
    pub url: String,
}

/// Always the same generic message so responses do not reveal whether an
/// email address is registered.
#[derive(Serialize, Debug, JsonSchema)]
pub struct PasswordResetResponse {
    pub message: String,
}

/// The `{user, role, loading}` view of the resolver state exposed to
/// presentation layers.
#[derive(Serialize, Debug, JsonSchema)]
pub struct SessionStateResponse {
    pub user: Option<UserResponse>,
    pub role: Role,
    pub loading: bool,
}
