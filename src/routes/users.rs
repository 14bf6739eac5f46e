use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::Role;
use crate::services::accounts::{self, ProfileUpdate};
use crate::services::admin::{self, AdminAccountForm, UserUpdate};
use crate::store::Repository;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockForm {
    pub is_blocked: Option<bool>,
}

pub async fn get_me(
    user: AuthenticatedUser,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    let view = accounts::current_user(store.get_ref(), user.identity()).await?;
    Ok(super::success(view))
}

pub async fn update_me(
    user: AuthenticatedUser,
    update: web::Json<ProfileUpdate>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    let view = accounts::update_profile(store.get_ref(), user.identity(), update.into_inner()).await?;
    Ok(super::success(view))
}

pub async fn list_users(
    user: AuthenticatedUser,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    Ok(super::success_list(admin::list_users(store.get_ref()).await?))
}

pub async fn create_user(
    user: AuthenticatedUser,
    form: web::Json<AdminAccountForm>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let created = admin::create_user(store.get_ref(), form.into_inner()).await?;
    Ok(super::created(created))
}

pub async fn get_user(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    Ok(super::success(
        admin::get_user(store.get_ref(), id.into_inner()).await?,
    ))
}

pub async fn update_user(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    update: web::Json<UserUpdate>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let updated = admin::update_user(store.get_ref(), id.into_inner(), update.into_inner()).await?;
    Ok(super::success(updated))
}

pub async fn delete_user(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    admin::delete_user(store.get_ref(), id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "User deleted",
    })))
}

pub async fn approve_user(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    Ok(super::success(
        admin::approve_user(store.get_ref(), id.into_inner()).await?,
    ))
}

/// An empty body blocks; anything else must be a valid `BlockForm`.
fn parse_block_form(body: &[u8]) -> Result<Option<BlockForm>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

/// Blocks by default; `{"isBlocked": false}` lifts the block.
pub async fn block_user(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    body: web::Bytes,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let blocked = parse_block_form(&body)?
        .and_then(|form| form.is_blocked)
        .unwrap_or(true);
    Ok(super::success(
        admin::set_blocked(store.get_ref(), id.into_inner(), blocked).await?,
    ))
}
