use secrecy::Secret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::user::{parse_email, parse_name};
use crate::models::{DoctorDetails, DoctorFields, Identity, Role, UserView};
use crate::services::accounts::{create_account, current_user, NewAccount};
use crate::store::Repository;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccountForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<Secret<String>>,
    pub role: Option<Role>,
    #[serde(flatten)]
    pub doctor: DoctorFields,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_approved: Option<bool>,
    pub is_blocked: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub doctor: DoctorFields,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: i64,
    pub total_doctors: i64,
    pub total_admins: i64,
    pub pending_doctors: i64,
    pub blocked_users: i64,
    pub total_appointments: i64,
    pub pending_appointments: i64,
    pub confirmed_appointments: i64,
    pub completed_appointments: i64,
    pub cancelled_appointments: i64,
    pub rejected_appointments: i64,
    pub total_revenue: f64,
}

async fn fetch_identity(store: &dyn Repository, id: Uuid) -> Result<Identity, ApiError> {
    store
        .identity_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

async fn save_identity(store: &dyn Repository, identity: &Identity) -> Result<UserView, ApiError> {
    if !store.update_identity(identity).await? {
        return Err(ApiError::not_found("User not found"));
    }
    current_user(store, identity).await
}

pub async fn list_users(store: &dyn Repository) -> Result<Vec<UserView>, ApiError> {
    Ok(store
        .list_identities(None)
        .await?
        .iter()
        .map(UserView::from)
        .collect())
}

pub async fn get_user(store: &dyn Repository, id: Uuid) -> Result<UserView, ApiError> {
    let identity = fetch_identity(store, id).await?;
    current_user(store, &identity).await
}

/// Accounts opened by an admin start approved, doctors included.
#[tracing::instrument(name = "Admin creates an account", skip(store, form))]
pub async fn create_user(
    store: &dyn Repository,
    form: AdminAccountForm,
) -> Result<UserView, ApiError> {
    let role = form.role.unwrap_or(Role::Patient);
    let mut account = NewAccount::from_parts(form.name, form.email, form.password, role)?;
    account.approved = true;
    account.doctor = Some(form.doctor);
    let (identity, _) = create_account(store, account).await?;
    current_user(store, &identity).await
}

#[tracing::instrument(name = "Admin updates a user", skip(store, update))]
pub async fn update_user(
    store: &dyn Repository,
    id: Uuid,
    update: UserUpdate,
) -> Result<UserView, ApiError> {
    let mut identity = fetch_identity(store, id).await?;
    if let Some(name) = update.name {
        identity.name = parse_name(&name)?;
    }
    if let Some(email) = update.email {
        identity.email = parse_email(&email)?;
    }
    if let Some(approved) = update.is_approved {
        identity.is_approved = approved;
    }
    if let Some(blocked) = update.is_blocked {
        identity.is_blocked = blocked;
    }
    save_identity(store, &identity).await
}

#[tracing::instrument(name = "Admin approves a user", skip(store))]
pub async fn approve_user(store: &dyn Repository, id: Uuid) -> Result<UserView, ApiError> {
    let mut identity = fetch_identity(store, id).await?;
    identity.is_approved = true;
    save_identity(store, &identity).await
}

#[tracing::instrument(name = "Admin changes a user's block flag", skip(store))]
pub async fn set_blocked(
    store: &dyn Repository,
    id: Uuid,
    blocked: bool,
) -> Result<UserView, ApiError> {
    let mut identity = fetch_identity(store, id).await?;
    identity.is_blocked = blocked;
    save_identity(store, &identity).await
}

/// Removes the identity together with any doctor profile it owns.
/// Appointments referencing it are kept.
#[tracing::instrument(name = "Admin deletes a user", skip(store))]
pub async fn delete_user(store: &dyn Repository, id: Uuid) -> Result<(), ApiError> {
    if !store.delete_identity(id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(())
}

#[tracing::instrument(name = "Admin creates a doctor", skip(store, form))]
pub async fn create_doctor(
    store: &dyn Repository,
    form: AdminAccountForm,
) -> Result<DoctorDetails, ApiError> {
    let mut account = NewAccount::from_parts(form.name, form.email, form.password, Role::Doctor)?;
    account.approved = true;
    account.doctor = Some(form.doctor);
    match create_account(store, account).await? {
        (identity, Some(profile)) => Ok(DoctorDetails::new(profile, &identity)),
        (_, None) => Err(anyhow::anyhow!("Doctor account was created without a profile").into()),
    }
}

#[tracing::instrument(name = "Admin updates a doctor", skip(store, update))]
pub async fn update_doctor(
    store: &dyn Repository,
    id: Uuid,
    update: DoctorUpdate,
) -> Result<DoctorDetails, ApiError> {
    let mut profile = store
        .doctor_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))?;
    let mut owner = store
        .identity_by_id(profile.identity_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))?;

    update.doctor.apply_to(&mut profile)?;
    let renamed = update.name.is_some() || update.email.is_some();
    if let Some(name) = update.name {
        owner.name = parse_name(&name)?;
    }
    if let Some(email) = update.email {
        owner.email = parse_email(&email)?;
    }

    if renamed && !store.update_identity(&owner).await? {
        return Err(ApiError::not_found("Doctor not found"));
    }
    if !store.update_doctor(&profile).await? {
        return Err(ApiError::not_found("Doctor not found"));
    }
    Ok(DoctorDetails::new(profile, &owner))
}

/// Deletes the profile and the identity that owns it.
#[tracing::instrument(name = "Admin deletes a doctor", skip(store))]
pub async fn delete_doctor(store: &dyn Repository, id: Uuid) -> Result<(), ApiError> {
    let profile = store
        .doctor_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))?;
    store.delete_doctor(profile.id).await?;
    store.delete_identity(profile.identity_id).await?;
    Ok(())
}

#[tracing::instrument(name = "Computing dashboard statistics", skip(store))]
pub async fn dashboard_stats(store: &dyn Repository) -> Result<DashboardStats, ApiError> {
    let identities = store.identity_counts().await?;
    let appointments = store.appointment_counts().await?;
    Ok(DashboardStats {
        total_patients: identities.patients,
        total_doctors: identities.doctors,
        total_admins: identities.admins,
        pending_doctors: identities.pending_doctors,
        blocked_users: identities.blocked,
        total_appointments: appointments.total,
        pending_appointments: appointments.pending,
        confirmed_appointments: appointments.confirmed,
        completed_appointments: appointments.completed,
        cancelled_appointments: appointments.cancelled,
        rejected_appointments: appointments.rejected,
        total_revenue: appointments.revenue,
    })
}
