//! Persistence seam shared by every service.
//!
//! Each method is a single point operation; nothing here spans a
//! transaction across collections.

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, DoctorProfile, Identity, Prescription, Role,
};

#[derive(thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::error::error_chain_fmt(self, f)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which appointments to list. Unset fields do not restrict.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCounts {
    pub patients: i64,
    pub doctors: i64,
    pub admins: i64,
    pub pending_doctors: i64,
    pub blocked: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCounts {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub rejected: i64,
    /// Sum of payment amounts over completed appointments.
    pub revenue: f64,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn insert_identity(&self, identity: &Identity) -> StoreResult<()>;
    async fn identity_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>>;
    /// `email` must already be normalised.
    async fn identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;
    async fn identities_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Identity>>;
    async fn list_identities(&self, role: Option<Role>) -> StoreResult<Vec<Identity>>;
    /// Returns `false` when no such identity exists.
    async fn update_identity(&self, identity: &Identity) -> StoreResult<bool>;
    /// Also removes the doctor profile owned by the identity.
    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool>;
    async fn identity_counts(&self) -> StoreResult<IdentityCounts>;

    async fn insert_doctor(&self, profile: &DoctorProfile) -> StoreResult<()>;
    async fn doctor_by_id(&self, id: Uuid) -> StoreResult<Option<DoctorProfile>>;
    async fn doctor_by_identity(&self, identity_id: Uuid) -> StoreResult<Option<DoctorProfile>>;
    async fn doctors_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<DoctorProfile>>;
    async fn list_doctors(&self) -> StoreResult<Vec<DoctorProfile>>;
    async fn update_doctor(&self, profile: &DoctorProfile) -> StoreResult<bool>;
    async fn delete_doctor(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()>;
    async fn appointment_by_id(&self, id: Uuid) -> StoreResult<Option<Appointment>>;
    /// Newest first.
    async fn list_appointments(&self, query: AppointmentQuery) -> StoreResult<Vec<Appointment>>;
    /// Times held by appointments of `doctor_id` on `date` that still occupy
    /// their slot.
    async fn booked_times(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<String>>;
    async fn set_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> StoreResult<bool>;
    async fn set_prescription(&self, id: Uuid, prescription: &Prescription) -> StoreResult<bool>;
    async fn appointment_counts(&self) -> StoreResult<AppointmentCounts>;
}
