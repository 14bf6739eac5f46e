use actix_web::{web, HttpResponse};

use crate::auth::{AuthenticatedUser, TokenKeys};
use crate::error::ApiError;
use crate::models::Role;
use crate::services::accounts::{self, LoginForm, RegistrationForm};
use crate::store::Repository;

#[tracing::instrument(name = "Register", skip(form, store, keys))]
pub async fn register(
    form: web::Json<RegistrationForm>,
    store: web::Data<dyn Repository>,
    keys: web::Data<TokenKeys>,
) -> Result<HttpResponse, ApiError> {
    let token = accounts::register(store.get_ref(), &keys, form.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "token": token,
    })))
}

#[tracing::instrument(name = "Login", skip(form, store, keys))]
pub async fn login(
    form: web::Json<LoginForm>,
    store: web::Data<dyn Repository>,
    keys: web::Data<TokenKeys>,
) -> Result<HttpResponse, ApiError> {
    let (token, user) = accounts::login(store.get_ref(), &keys, form.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "token": token,
        "user": user,
    })))
}

/// Same as [`login`] but only admins get through.
#[tracing::instrument(name = "Admin login", skip(form, store, keys))]
pub async fn admin_login(
    form: web::Json<LoginForm>,
    store: web::Data<dyn Repository>,
    keys: web::Data<TokenKeys>,
) -> Result<HttpResponse, ApiError> {
    let mut form = form.into_inner();
    form.role = Some(Role::Admin);
    let (token, user) = accounts::login(store.get_ref(), &keys, form).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "token": token,
        "user": user,
    })))
}

#[tracing::instrument(name = "Admin registers another admin", skip(form, store, keys, user), fields(admin_id = %user.id()))]
pub async fn admin_register(
    user: AuthenticatedUser,
    form: web::Json<RegistrationForm>,
    store: web::Data<dyn Repository>,
    keys: web::Data<TokenKeys>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let token = accounts::register_admin(store.get_ref(), &keys, form.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "token": token,
    })))
}

pub async fn me(
    user: AuthenticatedUser,
    store: web::Data<dyn Repository>,
) -> Result<HttpResponse, ApiError> {
    let view = accounts::current_user(store.get_ref(), user.identity()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": view,
    })))
}
