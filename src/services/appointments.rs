//! Appointment lifecycle: booking, status transitions, prescriptions and
//! the single read-composition used by every appointment read.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    Appointment, AppointmentStatus, AppointmentView, DoctorSummary, Identity, PartySummary,
    PaymentStatus, Prescription, Role,
};
use crate::services::parse_calendar_date;
use crate::store::{AppointmentQuery, Repository};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub doctor_id: Uuid,
    pub date: String,
    pub time: String,
    pub symptoms: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub payment_amount: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionForm {
    pub diagnosis: Option<String>,
    pub medications: Option<String>,
    pub instructions: Option<String>,
    pub follow_up_date: Option<String>,
}

impl PrescriptionForm {
    fn into_prescription(self) -> Result<Prescription, ApiError> {
        let follow_up_date = match self.follow_up_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => Some(parse_calendar_date(date)?),
            _ => None,
        };
        Ok(Prescription {
            diagnosis: self.diagnosis,
            medications: self.medications,
            instructions: self.instructions,
            follow_up_date,
        })
    }
}

/// How the acting identity relates to one appointment.
enum Relation {
    OwningPatient,
    OwningDoctor,
    Admin,
    Unrelated,
}

async fn relation_to(
    store: &dyn Repository,
    appointment: &Appointment,
    actor: &Identity,
) -> Result<Relation, ApiError> {
    let relation = match actor.role {
        Role::Admin => Relation::Admin,
        Role::Patient if actor.id == appointment.patient_id => Relation::OwningPatient,
        Role::Patient => Relation::Unrelated,
        Role::Doctor => match store.doctor_by_identity(actor.id).await? {
            Some(profile) if profile.id == appointment.doctor_id => Relation::OwningDoctor,
            _ => Relation::Unrelated,
        },
    };
    Ok(relation)
}

async fn fetch(store: &dyn Repository, id: Uuid) -> Result<Appointment, ApiError> {
    store
        .appointment_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))
}

/// Joins appointments with the display fields of their patient and doctor,
/// fetching each referenced collection once.
pub async fn compose(
    store: &dyn Repository,
    appointments: Vec<Appointment>,
) -> Result<Vec<AppointmentView>, ApiError> {
    let doctor_ids: Vec<Uuid> = appointments
        .iter()
        .map(|a| a.doctor_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let doctors = store.doctors_by_ids(&doctor_ids).await?;

    let identity_ids: Vec<Uuid> = appointments
        .iter()
        .map(|a| a.patient_id)
        .chain(doctors.iter().map(|d| d.identity_id))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let identities: HashMap<Uuid, Identity> = store
        .identities_by_ids(&identity_ids)
        .await?
        .into_iter()
        .map(|identity| (identity.id, identity))
        .collect();

    let doctors: HashMap<Uuid, DoctorSummary> = doctors
        .into_iter()
        .map(|profile| {
            let summary = DoctorSummary {
                id: profile.id,
                specialization: profile.specialization,
                fees: profile.fees,
                user: identities.get(&profile.identity_id).map(PartySummary::from),
            };
            (summary.id, summary)
        })
        .collect();

    Ok(appointments
        .into_iter()
        .map(|a| AppointmentView {
            id: a.id,
            patient: identities.get(&a.patient_id).map(PartySummary::from),
            doctor: doctors.get(&a.doctor_id).cloned(),
            date: a.date,
            time: a.time,
            status: a.status,
            symptoms: a.symptoms,
            prescription: a.prescription,
            payment_status: a.payment_status,
            payment_amount: a.payment_amount,
            created_at: a.created_at,
        })
        .collect())
}

async fn compose_one(
    store: &dyn Repository,
    appointment: Appointment,
) -> Result<AppointmentView, ApiError> {
    compose(store, vec![appointment])
        .await?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("Composition dropped an appointment").into())
}

/// Re-reads an appointment after a write; it may have vanished meanwhile.
async fn reload(store: &dyn Repository, id: Uuid) -> Result<AppointmentView, ApiError> {
    let appointment = fetch(store, id).await?;
    compose_one(store, appointment).await
}

#[tracing::instrument(
    name = "Booking a new appointment",
    skip(store, patient, form),
    fields(patient_id = %patient.id, doctor_id = %form.doctor_id)
)]
pub async fn create_appointment(
    store: &dyn Repository,
    patient: &Identity,
    form: BookingForm,
) -> Result<AppointmentView, ApiError> {
    let date = parse_calendar_date(&form.date)?;
    let symptoms = form
        .symptoms
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Please describe your symptoms"))?;
    if !form.payment_amount.is_finite() || form.payment_amount < 0.0 {
        return Err(ApiError::bad_request(
            "Payment amount must be a non-negative amount",
        ));
    }

    let doctor = store
        .doctor_by_id(form.doctor_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))?;
    if !doctor.available_slots.contains(&form.time) {
        return Err(ApiError::BadRequest(format!(
            "{} is not one of the doctor's time slots",
            form.time
        )));
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        doctor_id: doctor.id,
        date,
        time: form.time,
        status: AppointmentStatus::Pending,
        symptoms,
        prescription: None,
        payment_status: PaymentStatus::Pending,
        payment_amount: form.payment_amount,
        created_at: Utc::now(),
    };
    store.insert_appointment(&appointment).await?;
    tracing::info!(appointment_id = %appointment.id, "Appointment booked");
    compose_one(store, appointment).await
}

/// Patients may only cancel their own appointments; the referenced doctor
/// and admins may take any edge of the lifecycle.
#[tracing::instrument(
    name = "Changing appointment status",
    skip(store, actor),
    fields(actor_id = %actor.id, role = %actor.role)
)]
pub async fn transition_status(
    store: &dyn Repository,
    id: Uuid,
    next: AppointmentStatus,
    actor: &Identity,
) -> Result<AppointmentView, ApiError> {
    let appointment = fetch(store, id).await?;

    match relation_to(store, &appointment, actor).await? {
        Relation::OwningPatient if next == AppointmentStatus::Cancelled => {}
        Relation::OwningPatient => {
            return Err(ApiError::forbidden(
                "Patients may only cancel their appointments",
            ))
        }
        Relation::OwningDoctor | Relation::Admin => {}
        Relation::Unrelated => {
            return Err(ApiError::forbidden(
                "Not authorized to update this appointment",
            ))
        }
    }

    if appointment.status.is_terminal() {
        return Err(ApiError::BadRequest(format!(
            "Appointment is already {}",
            appointment.status
        )));
    }
    if !appointment.status.can_transition_to(next) {
        return Err(ApiError::BadRequest(format!(
            "Cannot change appointment status from {} to {}",
            appointment.status, next
        )));
    }

    if !store.set_appointment_status(id, next).await? {
        return Err(ApiError::not_found("Appointment not found"));
    }
    tracing::info!(from = %appointment.status, to = %next, "Appointment status changed");
    reload(store, id).await
}

/// Writes the prescription as given. Completing the appointment is a
/// separate transition.
#[tracing::instrument(
    name = "Attaching prescription",
    skip(store, form, actor),
    fields(actor_id = %actor.id)
)]
pub async fn attach_prescription(
    store: &dyn Repository,
    id: Uuid,
    form: PrescriptionForm,
    actor: &Identity,
) -> Result<AppointmentView, ApiError> {
    let appointment = fetch(store, id).await?;

    match relation_to(store, &appointment, actor).await? {
        Relation::OwningDoctor => {}
        Relation::OwningPatient | Relation::Admin | Relation::Unrelated => {
            return Err(ApiError::forbidden("Not authorized to add prescription"))
        }
    }
    if !appointment.status.accepts_prescription() {
        return Err(ApiError::Forbidden(format!(
            "Cannot add a prescription to a {} appointment",
            appointment.status
        )));
    }

    let prescription = form.into_prescription()?;
    if !store.set_prescription(id, &prescription).await? {
        return Err(ApiError::not_found("Appointment not found"));
    }
    reload(store, id).await
}

#[tracing::instrument(name = "Reading appointment", skip(store, actor), fields(actor_id = %actor.id))]
pub async fn read_appointment(
    store: &dyn Repository,
    id: Uuid,
    actor: &Identity,
) -> Result<AppointmentView, ApiError> {
    let appointment = fetch(store, id).await?;
    match relation_to(store, &appointment, actor).await? {
        Relation::OwningPatient | Relation::OwningDoctor | Relation::Admin => {
            compose_one(store, appointment).await
        }
        Relation::Unrelated => Err(ApiError::forbidden(
            "Not authorized to view this appointment",
        )),
    }
}

#[tracing::instrument(name = "Patient views their appointments", skip(store, patient), fields(patient_id = %patient.id))]
pub async fn patient_appointments(
    store: &dyn Repository,
    patient: &Identity,
) -> Result<Vec<AppointmentView>, ApiError> {
    let appointments = store
        .list_appointments(AppointmentQuery {
            patient_id: Some(patient.id),
            ..Default::default()
        })
        .await?;
    compose(store, appointments).await
}

#[tracing::instrument(name = "Doctor views their appointments", skip(store, doctor), fields(doctor_user_id = %doctor.id))]
pub async fn doctor_appointments(
    store: &dyn Repository,
    doctor: &Identity,
) -> Result<Vec<AppointmentView>, ApiError> {
    let profile = store
        .doctor_by_identity(doctor.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor profile not found"))?;
    let appointments = store
        .list_appointments(AppointmentQuery {
            doctor_id: Some(profile.id),
            ..Default::default()
        })
        .await?;
    compose(store, appointments).await
}

pub async fn all_appointments(store: &dyn Repository) -> Result<Vec<AppointmentView>, ApiError> {
    let appointments = store.list_appointments(AppointmentQuery::default()).await?;
    compose(store, appointments).await
}
