use chrono::{DateTime, Utc};
use enum_display::EnumDisplay;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, EnumDisplay, Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Hash)]
#[enum_display(case = "Lower")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    /// Approval state an account of this role starts with at self-registration.
    pub fn approved_on_registration(&self) -> bool {
        match self {
            Role::Patient | Role::Admin => true,
            Role::Doctor => false,
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("{} is not a valid role", other)),
        }
    }
}

/// An account record. The password is only ever held as a PHC hash string.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: Secret<String>,
    pub role: Role,
    pub is_approved: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Blocked accounts and doctors waiting for approval may not sign in.
    pub fn login_refusal(&self) -> Option<&'static str> {
        if self.is_blocked {
            return Some("Your account has been blocked. Please contact admin.");
        }
        if self.role == Role::Doctor && !self.is_approved {
            return Some("Your account is pending approval from admin");
        }
        None
    }
}

/// What callers get to see of an identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_approved: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
}

impl From<&Identity> for UserView {
    fn from(identity: &Identity) -> Self {
        UserView {
            id: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            is_approved: identity.is_approved,
            is_blocked: identity.is_blocked,
            created_at: identity.created_at,
            doctor_id: None,
        }
    }
}

/// Display fields attached to appointments and directory entries.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PartySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&Identity> for PartySummary {
    fn from(identity: &Identity) -> Self {
        PartySummary {
            id: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
        }
    }
}

pub fn parse_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    let length = name.chars().count();
    if length < 3 {
        return Err(ApiError::bad_request(
            "Name should have more than 3 characters",
        ));
    }
    if length > 30 {
        return Err(ApiError::bad_request("Name cannot exceed 30 characters"));
    }
    Ok(name.to_string())
}

/// Emails are unique case-insensitively, so they are stored lower-cased.
pub fn parse_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("Please enter a valid email"));
    }
    Ok(email)
}

pub fn check_password_strength(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 6 {
        return Err(ApiError::bad_request(
            "Password should be at least 6 characters",
        ));
    }
    Ok(())
}
