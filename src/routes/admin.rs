use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::Role;
use crate::services::admin::{self, AdminAccountForm, DoctorUpdate};
use crate::services::{appointments, directory};
use crate::store::Repository;

#[tracing::instrument(name = "Admin dashboard", skip(user, store), fields(admin_id = %user.id()))]
pub async fn admin_stats(
    user: AuthenticatedUser,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    Ok(super::success(admin::dashboard_stats(store.get_ref()).await?))
}

pub async fn admin_appointments(
    user: AuthenticatedUser,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    Ok(super::success_list(
        appointments::all_appointments(store.get_ref()).await?,
    ))
}

pub async fn admin_list_doctors(
    user: AuthenticatedUser,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    Ok(super::success_list(directory::all_doctors(store.get_ref()).await?))
}

pub async fn admin_create_doctor(
    user: AuthenticatedUser,
    form: web::Json<AdminAccountForm>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let doctor = admin::create_doctor(store.get_ref(), form.into_inner()).await?;
    Ok(super::created(doctor))
}

pub async fn admin_update_doctor(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    update: web::Json<DoctorUpdate>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let doctor = admin::update_doctor(store.get_ref(), id.into_inner(), update.into_inner()).await?;
    Ok(super::success(doctor))
}

pub async fn admin_delete_doctor(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    admin::delete_doctor(store.get_ref(), id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Doctor deleted",
    })))
}
