use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::DoctorFilter;
use crate::services::{availability, directory, parse_calendar_date};
use crate::store::Repository;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
}

#[tracing::instrument(name = "Doctor availability", skip(store))]
pub async fn get_doctor_availability(
    doctor_id: web::Path<Uuid>,
    query: web::Query<AvailabilityQuery>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    let date = query
        .date
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Please provide a date"))
        .and_then(parse_calendar_date)?;
    let slots =
        availability::doctor_availability(store.get_ref(), doctor_id.into_inner(), date).await?;
    Ok(super::success(slots))
}

pub async fn list_doctors(
    filter: web::Query<DoctorFilter>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    let doctors = directory::search_doctors(store.get_ref(), &filter).await?;
    Ok(super::success_list(doctors))
}

pub async fn get_doctor(
    doctor_id: web::Path<Uuid>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    let doctor = directory::doctor_details(store.get_ref(), doctor_id.into_inner()).await?;
    Ok(super::success(doctor))
}
