use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    AppointmentCounts, AppointmentQuery, IdentityCounts, Repository, StoreError, StoreResult,
};
use crate::models::{
    Appointment, AppointmentStatus, DayOfWeek, DoctorProfile, Identity, PaymentStatus,
    Prescription, Role,
};

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn write_error(e: sqlx::Error, conflict: &str, context: &'static str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(conflict.to_string())
        }
        _ => {
            tracing::error!("Failed to execute query: {:?}", e);
            StoreError::Unexpected(anyhow::Error::from(e).context(context))
        }
    }
}

#[derive(FromRow)]
struct IdentityRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_approved: bool,
    is_blocked: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = anyhow::Error;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        Ok(Identity {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: Secret::new(row.password_hash),
            role: Role::try_from(row.role).map_err(anyhow::Error::msg)?,
            is_approved: row.is_approved,
            is_blocked: row.is_blocked,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct DoctorRow {
    id: Uuid,
    identity_id: Uuid,
    specialization: String,
    qualifications: Vec<String>,
    experience: String,
    fees: f64,
    available_days: Vec<String>,
    available_slots: Vec<String>,
    bio: Option<String>,
    address: String,
}

impl TryFrom<DoctorRow> for DoctorProfile {
    type Error = anyhow::Error;

    fn try_from(row: DoctorRow) -> Result<Self, Self::Error> {
        let available_days = row
            .available_days
            .into_iter()
            .map(DayOfWeek::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::msg)?;
        Ok(DoctorProfile {
            id: row.id,
            identity_id: row.identity_id,
            specialization: row.specialization,
            qualifications: row.qualifications,
            experience: row.experience,
            fees: row.fees,
            available_days,
            available_slots: row.available_slots,
            bio: row.bio,
            address: row.address,
        })
    }
}

#[derive(FromRow)]
struct AppointmentRow {
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    date: NaiveDate,
    time: String,
    status: String,
    symptoms: String,
    prescription: Option<Json<Prescription>>,
    payment_status: String,
    payment_amount: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = anyhow::Error;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            date: row.date,
            time: row.time,
            status: AppointmentStatus::try_from(row.status).map_err(anyhow::Error::msg)?,
            symptoms: row.symptoms,
            prescription: row.prescription.map(|json| json.0),
            payment_status: PaymentStatus::try_from(row.payment_status)
                .map_err(anyhow::Error::msg)?,
            payment_amount: row.payment_amount,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter()
        .map(T::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::Unexpected)
}

const IDENTITY_COLUMNS: &str =
    "id, name, email, password_hash, role, is_approved, is_blocked, created_at";
const DOCTOR_COLUMNS: &str = "id, identity_id, specialization, qualifications, experience, fees, \
     available_days, available_slots, bio, address";
const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, date, time, status, symptoms, \
     prescription, payment_status, payment_amount, created_at";

#[async_trait]
impl Repository for PgRepository {
    #[tracing::instrument(name = "Saving new identity in the database", skip(self, identity))]
    async fn insert_identity(&self, identity: &Identity) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO identities (id, name, email, password_hash, role, is_approved, is_blocked, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(identity.id)
        .bind(&identity.name)
        .bind(&identity.email)
        .bind(identity.password_hash.expose_secret())
        .bind(identity.role.to_string())
        .bind(identity.is_approved)
        .bind(identity.is_blocked)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "Email already exists", "Failed to insert identity"))?;
        Ok(())
    }

    async fn identity_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {} FROM identities WHERE id = $1",
            IDENTITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch identity by id")?;
        Ok(row.map(Identity::try_from).transpose()?)
    }

    async fn identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {} FROM identities WHERE email = $1",
            IDENTITY_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch identity by email")?;
        Ok(row.map(Identity::try_from).transpose()?)
    }

    async fn identities_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {} FROM identities WHERE id = ANY($1)",
            IDENTITY_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch identities")?;
        convert_all(rows)
    }

    async fn list_identities(&self, role: Option<Role>) -> StoreResult<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {} FROM identities WHERE ($1::TEXT IS NULL OR role = $1) ORDER BY created_at DESC",
            IDENTITY_COLUMNS
        ))
        .bind(role.map(|role| role.to_string()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list identities")?;
        convert_all(rows)
    }

    #[tracing::instrument(name = "Updating identity in the database", skip(self, identity))]
    async fn update_identity(&self, identity: &Identity) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET name = $2, email = $3, password_hash = $4, role = $5, is_approved = $6, is_blocked = $7
            WHERE id = $1
            "#,
        )
        .bind(identity.id)
        .bind(&identity.name)
        .bind(&identity.email)
        .bind(identity.password_hash.expose_secret())
        .bind(identity.role.to_string())
        .bind(identity.is_approved)
        .bind(identity.is_blocked)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "Email already exists", "Failed to update identity"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete identity")?;
        Ok(result.rows_affected() > 0)
    }

    async fn identity_counts(&self) -> StoreResult<IdentityCounts> {
        let counts = sqlx::query_as::<_, IdentityCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE role = 'patient') AS patients,
                COUNT(*) FILTER (WHERE role = 'doctor') AS doctors,
                COUNT(*) FILTER (WHERE role = 'admin') AS admins,
                COUNT(*) FILTER (WHERE role = 'doctor' AND NOT is_approved) AS pending_doctors,
                COUNT(*) FILTER (WHERE is_blocked) AS blocked
            FROM identities
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count identities")?;
        Ok(counts)
    }

    #[tracing::instrument(name = "Saving new doctor profile in the database", skip(self, profile))]
    async fn insert_doctor(&self, profile: &DoctorProfile) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO doctor_profiles (id, identity_id, specialization, qualifications, experience,
                fees, available_days, available_slots, bio, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(profile.id)
        .bind(profile.identity_id)
        .bind(&profile.specialization)
        .bind(&profile.qualifications)
        .bind(&profile.experience)
        .bind(profile.fees)
        .bind(days_to_text(&profile.available_days))
        .bind(&profile.available_slots)
        .bind(&profile.bio)
        .bind(&profile.address)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                "This account already has a doctor profile",
                "Failed to insert doctor profile",
            )
        })?;
        Ok(())
    }

    async fn doctor_by_id(&self, id: Uuid) -> StoreResult<Option<DoctorProfile>> {
        let row = sqlx::query_as::<_, DoctorRow>(&format!(
            "SELECT {} FROM doctor_profiles WHERE id = $1",
            DOCTOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch doctor profile")?;
        Ok(row.map(DoctorProfile::try_from).transpose()?)
    }

    async fn doctor_by_identity(&self, identity_id: Uuid) -> StoreResult<Option<DoctorProfile>> {
        let row = sqlx::query_as::<_, DoctorRow>(&format!(
            "SELECT {} FROM doctor_profiles WHERE identity_id = $1",
            DOCTOR_COLUMNS
        ))
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch doctor profile by owner")?;
        Ok(row.map(DoctorProfile::try_from).transpose()?)
    }

    async fn doctors_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<DoctorProfile>> {
        let rows = sqlx::query_as::<_, DoctorRow>(&format!(
            "SELECT {} FROM doctor_profiles WHERE id = ANY($1)",
            DOCTOR_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch doctor profiles")?;
        convert_all(rows)
    }

    async fn list_doctors(&self) -> StoreResult<Vec<DoctorProfile>> {
        let rows = sqlx::query_as::<_, DoctorRow>(&format!(
            "SELECT {} FROM doctor_profiles ORDER BY specialization, id",
            DOCTOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list doctor profiles")?;
        convert_all(rows)
    }

    #[tracing::instrument(name = "Updating doctor profile in the database", skip(self, profile))]
    async fn update_doctor(&self, profile: &DoctorProfile) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE doctor_profiles
            SET specialization = $2, qualifications = $3, experience = $4, fees = $5,
                available_days = $6, available_slots = $7, bio = $8, address = $9
            WHERE id = $1
            "#,
        )
        .bind(profile.id)
        .bind(&profile.specialization)
        .bind(&profile.qualifications)
        .bind(&profile.experience)
        .bind(profile.fees)
        .bind(days_to_text(&profile.available_days))
        .bind(&profile.available_slots)
        .bind(&profile.bio)
        .bind(&profile.address)
        .execute(&self.pool)
        .await
        .context("Failed to update doctor profile")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_doctor(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM doctor_profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete doctor profile")?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(
        name = "Saving new appointment details in the database",
        skip(self, appointment)
    )]
    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments (id, patient_id, doctor_id, date, time, status, symptoms,
                prescription, payment_status, payment_amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.date)
        .bind(&appointment.time)
        .bind(appointment.status.to_string())
        .bind(&appointment.symptoms)
        .bind(appointment.prescription.as_ref().map(Json))
        .bind(appointment.payment_status.to_string())
        .bind(appointment.payment_amount)
        .bind(appointment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "Appointment already exists", "Failed to insert appointment"))?;
        Ok(())
    }

    async fn appointment_by_id(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        let row = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE id = $1",
            APPOINTMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch appointment")?;
        Ok(row.map(Appointment::try_from).transpose()?)
    }

    #[tracing::instrument(name = "Fetching appointment details", skip(self))]
    async fn list_appointments(&self, query: AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            r#"
            SELECT {} FROM appointments
            WHERE ($1::UUID IS NULL OR patient_id = $1)
              AND ($2::UUID IS NULL OR doctor_id = $2)
            ORDER BY created_at DESC
            "#,
            APPOINTMENT_COLUMNS
        ))
        .bind(query.patient_id)
        .bind(query.doctor_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list appointments")?;
        convert_all(rows)
    }

    async fn booked_times(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<String>> {
        let times = sqlx::query_scalar::<_, String>(
            "SELECT time FROM appointments WHERE doctor_id = $1 AND date = $2 AND status <> $3",
        )
        .bind(doctor_id)
        .bind(date)
        .bind(AppointmentStatus::Cancelled.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch booked times")?;
        Ok(times)
    }

    async fn set_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE appointments SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update appointment status")?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_prescription(&self, id: Uuid, prescription: &Prescription) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE appointments SET prescription = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(prescription))
            .execute(&self.pool)
            .await
            .context("Failed to attach prescription")?;
        Ok(result.rows_affected() > 0)
    }

    async fn appointment_counts(&self) -> StoreResult<AppointmentCounts> {
        let counts = sqlx::query_as::<_, AppointmentCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
                COALESCE(SUM(payment_amount) FILTER (WHERE status = 'completed'), 0)::DOUBLE PRECISION AS revenue
            FROM appointments
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count appointments")?;
        Ok(counts)
    }
}

fn days_to_text(days: &[DayOfWeek]) -> Vec<String> {
    days.iter().map(ToString::to_string).collect()
}
