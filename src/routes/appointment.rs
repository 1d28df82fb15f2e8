use crate::auth::CurrentUser;
use crate::error::app_error::AppError;
use crate::models::appointment::{AppointmentRequest, AppointmentResponse, StatusUpdateRequest};
use crate::store::appointment::AppointmentRepository;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get, patch, post};
use rocket_okapi::openapi;
use std::sync::Arc;
use validator::Validate;

/// Book an appointment. The record starts `Pending`.
#[openapi(tag = "Appointments")]
#[post("/", data = "<payload>")]
pub async fn create_appointment(
    repo: &State<Arc<dyn AppointmentRepository>>,
    _current_user: CurrentUser,
    payload: Json<AppointmentRequest>,
) -> Result<(Status, Json<AppointmentResponse>), AppError> {
    payload.validate()?;

    let appointment = repo.create(&payload).await?;
    Ok((Status::Created, Json(AppointmentResponse::from(&appointment))))
}

/// List all appointments in insertion order.
#[openapi(tag = "Appointments")]
#[get("/")]
pub async fn list_appointments(repo: &State<Arc<dyn AppointmentRepository>>, _current_user: CurrentUser) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    let appointments = repo.list().await?;
    Ok(Json(appointments.iter().map(AppointmentResponse::from).collect()))
}

/// Change an appointment's status. Only doctors and admins may do this, and
/// only along the legal transition table; illegal transitions answer 409.
#[openapi(tag = "Appointments")]
#[patch("/<id>/status", data = "<payload>")]
pub async fn update_appointment_status(
    repo: &State<Arc<dyn AppointmentRepository>>,
    current_user: CurrentUser,
    id: &str,
    payload: Json<StatusUpdateRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    if !current_user.role.can_manage_appointments() {
        return Err(AppError::Forbidden);
    }

    let appointment = repo.update_status(id, payload.status).await?;
    Ok(Json(AppointmentResponse::from(&appointment)))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![create_appointment, list_appointments, update_appointment_status]
}
