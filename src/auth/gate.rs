use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{web, FromRequest, HttpRequest};
use anyhow::Context;
use uuid::Uuid;

use crate::auth::token::TokenKeys;
use crate::error::ApiError;
use crate::models::{Identity, Role};
use crate::store::Repository;

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// The caller behind a valid bearer token.
///
/// Taking this as a handler argument makes the route require authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.0.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                self.0.role
            )))
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get("Authorization")
        .ok_or_else(|| ApiError::Unauthorized(NOT_AUTHORIZED.into()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(NOT_AUTHORIZED.into()))?;
    header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(NOT_AUTHORIZED.into()))
}

/// Resolves a bearer token to the identity it was issued for. The identity
/// is re-read so deleted, blocked or unapproved accounts get no further than
/// they would at login.
#[tracing::instrument(name = "Resolve bearer token", skip(token, keys, store), fields(user_id = tracing::field::Empty))]
pub async fn resolve_identity(
    token: &str,
    keys: &TokenKeys,
    store: &dyn Repository,
) -> Result<Identity, ApiError> {
    let claims = keys.verify(token).map_err(|e| {
        tracing::debug!(error = ?e, "Rejected bearer token");
        ApiError::Unauthorized(NOT_AUTHORIZED.into())
    })?;
    let identity = store
        .identity_by_id(claims.sub)
        .await
        .context("Failed to fetch identity for token")?
        .ok_or_else(|| ApiError::Unauthorized(NOT_AUTHORIZED.into()))?;
    if let Some(reason) = identity.login_refusal() {
        return Err(ApiError::Unauthorized(reason.into()));
    }
    tracing::Span::current().record("user_id", tracing::field::display(identity.id));
    Ok(identity)
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req.headers());
        let keys = req.app_data::<web::Data<TokenKeys>>().cloned();
        let store = req.app_data::<web::Data<dyn Repository>>().cloned();

        Box::pin(async move {
            let token = token?;
            let (keys, store) = keys
                .zip(store)
                .ok_or_else(|| anyhow::anyhow!("Token keys or store missing from app data"))?;
            let identity = resolve_identity(&token, &keys, store.get_ref()).await?;
            Ok(AuthenticatedUser(identity))
        })
    }
}
