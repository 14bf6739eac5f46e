mod admin;
mod appointments;
mod auth;
mod doctors;
mod health_check;
mod users;

pub use admin::*;
pub use appointments::*;
pub use auth::*;
pub use doctors::*;
pub use health_check::*;
pub use users::*;

use actix_web::HttpResponse;
use serde::Serialize;

/// `{"success": true, "data": ...}`
pub(crate) fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": data,
    }))
}

/// `{"success": true, "count": n, "data": [...]}`
pub(crate) fn success_list<T: Serialize>(data: Vec<T>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "data": data,
    }))
}

pub(crate) fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": data,
    }))
}
