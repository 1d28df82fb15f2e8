use crate::config::Config;
use crate::error::app_error::AppError;
use crate::models::auth::{
    AuthResponse, LoginRequest, OAuthRedirectResponse, OAuthRequest, PasswordResetRequest, PasswordResetResponse, SessionStateResponse, SignupRequest,
    SignupResponse, UserResponse,
};
use crate::session::resolver::{SessionResolver, SignupOutcome};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use std::sync::Arc;
use validator::Validate;

/// Log in with email and password. The role in the response is derived from
/// the email by the resolver's role policy.
#[openapi(tag = "Auth")]
#[post("/login", data = "<payload>")]
pub async fn login(resolver: &State<Arc<SessionResolver>>, payload: Json<LoginRequest>) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let user = resolver.login(&payload.email, &payload.password).await?;
    let role = resolver.state().role;

    Ok(Json(AuthResponse {
        user: UserResponse::from(&user),
        role,
    }))
}

/// Create an account. Depending on provider settings the account is either
/// active immediately or parked behind an email confirmation; the latter is
/// reported with 200 and no user, not as an error.
#[openapi(tag = "Auth")]
#[post("/signup", data = "<payload>")]
pub async fn signup(resolver: &State<Arc<SessionResolver>>, payload: Json<SignupRequest>) -> Result<(Status, Json<SignupResponse>), AppError> {
    payload.validate()?;

    match resolver.signup(&payload.email, &payload.password).await? {
        SignupOutcome::Active(user) => {
            let role = resolver.state().role;
            Ok((
                Status::Created,
                Json(SignupResponse {
                    message: "Account created.".to_string(),
                    user: Some(UserResponse::from(&user)),
                    role,
                }),
            ))
        }
        SignupOutcome::ConfirmationRequired => Ok((
            Status::Ok,
            Json(SignupResponse {
                message: "Check your email to confirm your account.".to_string(),
                user: None,
                role: resolver.state().role,
            }),
        )),
    }
}

/// Sign out. Always succeeds from the caller's point of view; local state is
/// cleared even when the provider has nothing to sign out of.
#[openapi(tag = "Auth")]
#[post("/logout")]
pub async fn logout(resolver: &State<Arc<SessionResolver>>) -> Result<Status, AppError> {
    resolver.logout().await;
    Ok(Status::Ok)
}

/// Start a redirect-based OAuth flow. Returns the URL the client must
/// navigate to; completion is observed via the provider's session events.
#[openapi(tag = "Auth")]
#[post("/oauth", data = "<payload>")]
pub async fn oauth(
    resolver: &State<Arc<SessionResolver>>,
    config: &State<Config>,
    payload: Json<OAuthRequest>,
) -> Result<Json<OAuthRedirectResponse>, AppError> {
    payload.validate()?;

    let url = resolver.sign_in_with_oauth(&payload.provider, &config.identity.oauth_redirect_url)?;
    Ok(Json(OAuthRedirectResponse { url }))
}

/// Request a password reset email. The response is the same whether or not
/// the address is registered.
#[openapi(tag = "Auth")]
#[post("/password-reset", data = "<payload>")]
pub async fn password_reset(
    resolver: &State<Arc<SessionResolver>>,
    config: &State<Config>,
    payload: Json<PasswordResetRequest>,
) -> Result<Json<PasswordResetResponse>, AppError> {
    payload.validate()?;

    resolver.send_password_reset(&payload.email, &config.identity.password_reset_redirect_url).await;

    Ok(Json(PasswordResetResponse {
        message: "If your email address exists in our system, you will receive a password reset link shortly.".to_string(),
    }))
}

/// The `{user, role, loading}` view of the current resolver state.
#[openapi(tag = "Auth")]
#[get("/session")]
pub async fn session(resolver: &State<Arc<SessionResolver>>) -> Json<SessionStateResponse> {
    let state = resolver.state();
    Json(SessionStateResponse {
        user: state.user.as_ref().map(UserResponse::from),
        role: state.role,
        loading: state.loading(),
    })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![login, signup, logout, oauth, password_reset, session]
}

#[cfg(test)]
mod tests {
    use crate::error::app_error::AuthFailureReason;
    use crate::test_utils::test_rocket;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;

    #[rocket::async_test]
    async fn login_returns_user_and_derived_role() {
        let (rocket, _provider) = test_rocket().await;
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(r#"{"email":"admin@clinic.test","password":"pw"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["role"], "admin");
        assert_eq!(body["user"]["email"], "admin@clinic.test");
    }

    #[rocket::async_test]
    async fn login_with_bad_credentials_is_classified() {
        let (rocket, provider) = test_rocket().await;
        provider.fail_next_auth(AuthFailureReason::InvalidCredentials);
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(r#"{"email":"jane@clinic.test","password":"wrong"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
        let body = response.into_string().await.unwrap();
        assert!(body.contains("Invalid email or password"));
    }

    #[rocket::async_test]
    async fn login_with_malformed_email_fails_validation() {
        let (rocket, _provider) = test_rocket().await;
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(r#"{"email":"not-an-email","password":"pw"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn signup_reports_pending_confirmation_without_error() {
        let (rocket, provider) = test_rocket().await;
        provider.require_confirmation(true);
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client
            .post("/api/auth/signup")
            .header(ContentType::JSON)
            .body(r#"{"email":"jane@clinic.test","password":"password1"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert!(body["user"].is_null());
        assert_eq!(body["message"], "Check your email to confirm your account.");
    }

    #[rocket::async_test]
    async fn session_reflects_login_and_logout() {
        let (rocket, _provider) = test_rocket().await;
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client.get("/api/auth/session").dispatch().await;
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["role"], "unknown");
        assert!(body["user"].is_null());

        client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(r#"{"email":"doctor@clinic.test","password":"pw"}"#)
            .dispatch()
            .await;

        let body: serde_json::Value = client.get("/api/auth/session").dispatch().await.into_json().await.unwrap();
        assert_eq!(body["role"], "doctor");

        client.post("/api/auth/logout").dispatch().await;
        let body: serde_json::Value = client.get("/api/auth/session").dispatch().await.into_json().await.unwrap();
        assert_eq!(body["role"], "unknown");
        assert!(body["user"].is_null());
    }

    #[rocket::async_test]
    async fn password_reset_always_returns_the_generic_message() {
        let (rocket, _provider) = test_rocket().await;
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client
            .post("/api/auth/password-reset")
            .header(ContentType::JSON)
            .body(r#"{"email":"nobody@clinic.test"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert!(body["message"].as_str().unwrap().starts_with("If your email address exists"));
    }

    #[rocket::async_test]
    async fn oauth_returns_a_redirect_url() {
        let (rocket, _provider) = test_rocket().await;
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client
            .post("/api/auth/oauth")
            .header(ContentType::JSON)
            .body(r#"{"provider":"google"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert!(body["url"].as_str().unwrap().contains("provider=google"));
    }
}
