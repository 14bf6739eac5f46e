use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{AppointmentStatus, Role};
use crate::services::appointments::{self as lifecycle, BookingForm, PrescriptionForm};
use crate::store::Repository;

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionBody {
    pub prescription: PrescriptionForm,
}

#[tracing::instrument(
    name = "Booking a new appointment",
    skip(user, form, store),
    fields(user_id = %user.id())
)]
pub async fn booking_appointment(
    user: AuthenticatedUser,
    form: web::Json<BookingForm>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Patient])?;
    let appointment =
        lifecycle::create_appointment(store.get_ref(), user.identity(), form.into_inner()).await?;
    Ok(super::created(appointment))
}

#[tracing::instrument(name = "Patient views their appointments", skip(user, store))]
pub async fn get_patient_appointments(
    user: AuthenticatedUser,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Patient])?;
    let appointments = lifecycle::patient_appointments(store.get_ref(), user.identity()).await?;
    Ok(super::success_list(appointments))
}

#[tracing::instrument(name = "Doctor views their appointments", skip(user, store))]
pub async fn get_doctor_appointments(
    user: AuthenticatedUser,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Doctor])?;
    let appointments = lifecycle::doctor_appointments(store.get_ref(), user.identity()).await?;
    Ok(super::success_list(appointments))
}

pub async fn get_appointment(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    let appointment =
        lifecycle::read_appointment(store.get_ref(), id.into_inner(), user.identity()).await?;
    Ok(super::success(appointment))
}

#[tracing::instrument(
    name = "Updating appointment status",
    skip(user, form, store),
    fields(status = %form.status)
)]
pub async fn update_appointment_status(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    form: web::Json<StatusForm>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    let appointment = lifecycle::transition_status(
        store.get_ref(),
        id.into_inner(),
        form.status,
        user.identity(),
    )
    .await?;
    Ok(super::success(appointment))
}

pub async fn add_prescription(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    body: web::Json<PrescriptionBody>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Doctor])?;
    let appointment = lifecycle::attach_prescription(
        store.get_ref(),
        id.into_inner(),
        body.into_inner().prescription,
        user.identity(),
    )
    .await?;
    Ok(super::success(appointment))
}
