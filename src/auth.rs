use crate::error::app_error::AppError;
use crate::models::role::Role;
use crate::session::resolver::SessionResolver;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Responses, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use serde::Serialize;
use std::sync::Arc;

/// The authenticated caller of a request: identity plus the role derived
/// from it. Built by checking the bearer token against the resolver's
/// published session.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
}

pub(crate) fn parse_bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let Some(token) = req.headers().get_one("Authorization").and_then(parse_bearer_token) else {
            return Outcome::Error((Status::Unauthorized, AppError::Unauthorized));
        };

        let resolver = match req.rocket().state::<Arc<SessionResolver>>() {
            Some(resolver) => resolver,
            None => return Outcome::Error((Status::InternalServerError, AppError::Unauthorized)),
        };

        let state = resolver.state();
        match state.session {
            Some(session) if session.access_token == token && session.expires_at > chrono::Utc::now() => {
                let current_user = CurrentUser {
                    id: session.user.id.clone(),
                    email: session.user.email.clone(),
                    role: state.role,
                };
                req.local_cache(|| Some(current_user.clone()));
                Outcome::Success(current_user)
            }
            _ => Outcome::Error((Status::Unauthorized, AppError::Unauthorized)),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for CurrentUser {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some("Bearer access token issued by the identity provider. Obtain one via POST /api/auth/login.".to_string()),
            data: SecuritySchemeData::Http {
                scheme: "bearer".to_string(),
                bearer_format: Some("opaque".to_string()),
            },
            extensions: Object::default(),
        };

        let mut security_req = SecurityRequirement::new();
        security_req.insert("bearerAuth".to_string(), Vec::new());

        Ok(RequestHeaderInput::Security("bearerAuth".to_string(), security_scheme, security_req))
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response};
        let mut responses = Responses::default();
        responses.responses.insert(
            "401".to_string(),
            RefOr::Object(Response {
                description: "Unauthorized - Authentication required".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bearer_token;

    #[test]
    fn parse_bearer_token_valid() {
        assert_eq!(parse_bearer_token("Bearer abc123"), Some("abc123"));
    }

    #[test]
    fn parse_bearer_token_wrong_scheme() {
        assert_eq!(parse_bearer_token("Basic abc123"), None);
    }

    #[test]
    fn parse_bearer_token_empty() {
        assert_eq!(parse_bearer_token("Bearer "), None);
    }
}
