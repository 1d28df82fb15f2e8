use crate::models::appointment::AppointmentStatus;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use std::fmt;
use std::io::Cursor;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

/// User-facing classification of an auth operation failure. The provider's
/// raw error is collapsed into exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailureReason {
    InvalidCredentials,
    MalformedEmail,
    EmailNotConfirmed,
    Other(String),
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailureReason::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthFailureReason::MalformedEmail => write!(f, "Email address is not valid"),
            AuthFailureReason::EmailNotConfirmed => write!(f, "Email address has not been confirmed"),
            AuthFailureReason::Other(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error")]
    Storage {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Internal server error")]
    Serialization {
        message: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Identity provider error: {message}")]
    Provider { message: String },
    #[error("Authentication failed: {0}")]
    AuthFailed(AuthFailureReason),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Illegal status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),
    #[error("Internal server error")]
    ConfigurationError {
        message: String,
        #[source]
        source: figment::Error,
    },
}

impl AppError {
    pub fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            message: message.into(),
            source,
        }
    }

    pub fn serialization(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            message: message.into(),
            source,
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider { message: message.into() }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::provider(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::ConfigurationError {
            message: "Failed to read configuration".to_string(),
            source: e,
        }
    }
}

impl From<&AppError> for Status {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::Storage { .. } => Status::InternalServerError,
            AppError::Serialization { .. } => Status::InternalServerError,
            AppError::Provider { .. } => Status::BadGateway,
            AppError::AuthFailed(AuthFailureReason::MalformedEmail) => Status::BadRequest,
            AppError::AuthFailed(_) => Status::Forbidden,
            AppError::Unauthorized => Status::Unauthorized,
            AppError::Forbidden => Status::Forbidden,
            AppError::NotFound(_) => Status::NotFound,
            AppError::InvalidStatusTransition { .. } => Status::Conflict,
            AppError::BadRequest(_) => Status::BadRequest,
            AppError::ValidationError(_) => Status::BadRequest,
            AppError::ConfigurationError { .. } => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &Request<'_>) -> rocket::response::Result<'static> {
        let method = req.method();
        let uri = req.uri();

        let request_id = req
            .local_cache(|| None::<crate::middleware::RequestId>)
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or("unknown");

        let user_id = req
            .local_cache(|| None::<crate::auth::CurrentUser>)
            .as_ref()
            .map(|u| u.id.clone())
            .unwrap_or_else(|| "anonymous".to_string());

        error!(
            error = ?self,
            request_id = %request_id,
            user_id = %user_id,
            method = %method,
            uri = %uri,
            "request failed"
        );

        let status = Status::from(&self);
        let body = self.to_string();

        Response::build().status(status).sized_body(body.len(), Cursor::new(body)).ok()
    }
}

impl OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "Bad Request"),
            ("401", "Unauthorized"),
            ("403", "Forbidden"),
            ("404", "Not Found"),
            ("409", "Conflict"),
            ("500", "Internal Server Error"),
            ("502", "Bad Gateway"),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}
