use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex as TokioMutex;
use uuid::Uuid;

use super::{
    AppointmentCounts, AppointmentQuery, IdentityCounts, Repository, StoreError, StoreResult,
};
use crate::models::{
    Appointment, AppointmentStatus, DoctorProfile, Identity, Prescription, Role,
};

/// Process-local backend with the same semantics as the PostgreSQL one.
///
/// Locks are always taken in field order: identities, doctors, appointments.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    identities: TokioMutex<HashMap<Uuid, Identity>>,
    doctors: TokioMutex<HashMap<Uuid, DoctorProfile>>,
    appointments: TokioMutex<HashMap<Uuid, Appointment>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(identities: &HashMap<Uuid, Identity>, email: &str, except: Uuid) -> bool {
    identities
        .values()
        .any(|other| other.id != except && other.email == email)
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_identity(&self, identity: &Identity) -> StoreResult<()> {
        let mut identities = self.identities.lock().await;
        if email_taken(&identities, &identity.email, identity.id) {
            return Err(StoreError::Conflict("Email already exists".into()));
        }
        identities.insert(identity.id, identity.clone());
        Ok(())
    }

    async fn identity_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        Ok(self.identities.lock().await.get(&id).cloned())
    }

    async fn identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let identities = self.identities.lock().await;
        Ok(identities.values().find(|i| i.email == email).cloned())
    }

    async fn identities_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Identity>> {
        let identities = self.identities.lock().await;
        Ok(ids.iter().filter_map(|id| identities.get(id).cloned()).collect())
    }

    async fn list_identities(&self, role: Option<Role>) -> StoreResult<Vec<Identity>> {
        let identities = self.identities.lock().await;
        let mut listed: Vec<Identity> = identities
            .values()
            .filter(|i| role.map_or(true, |role| i.role == role))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn update_identity(&self, identity: &Identity) -> StoreResult<bool> {
        let mut identities = self.identities.lock().await;
        if !identities.contains_key(&identity.id) {
            return Ok(false);
        }
        if email_taken(&identities, &identity.email, identity.id) {
            return Err(StoreError::Conflict("Email already exists".into()));
        }
        identities.insert(identity.id, identity.clone());
        Ok(true)
    }

    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool> {
        let mut identities = self.identities.lock().await;
        let mut doctors = self.doctors.lock().await;
        let removed = identities.remove(&id).is_some();
        if removed {
            doctors.retain(|_, profile| profile.identity_id != id);
        }
        Ok(removed)
    }

    async fn identity_counts(&self) -> StoreResult<IdentityCounts> {
        let identities = self.identities.lock().await;
        let mut counts = IdentityCounts::default();
        for identity in identities.values() {
            match identity.role {
                Role::Patient => counts.patients += 1,
                Role::Doctor => {
                    counts.doctors += 1;
                    if !identity.is_approved {
                        counts.pending_doctors += 1;
                    }
                }
                Role::Admin => counts.admins += 1,
            }
            if identity.is_blocked {
                counts.blocked += 1;
            }
        }
        Ok(counts)
    }

    async fn insert_doctor(&self, profile: &DoctorProfile) -> StoreResult<()> {
        let identities = self.identities.lock().await;
        let mut doctors = self.doctors.lock().await;
        if !identities.contains_key(&profile.identity_id) {
            return Err(StoreError::Unexpected(anyhow::anyhow!(
                "Doctor profile references a missing identity"
            )));
        }
        if doctors
            .values()
            .any(|other| other.identity_id == profile.identity_id)
        {
            return Err(StoreError::Conflict(
                "This account already has a doctor profile".into(),
            ));
        }
        doctors.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn doctor_by_id(&self, id: Uuid) -> StoreResult<Option<DoctorProfile>> {
        Ok(self.doctors.lock().await.get(&id).cloned())
    }

    async fn doctor_by_identity(&self, identity_id: Uuid) -> StoreResult<Option<DoctorProfile>> {
        let doctors = self.doctors.lock().await;
        Ok(doctors
            .values()
            .find(|profile| profile.identity_id == identity_id)
            .cloned())
    }

    async fn doctors_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<DoctorProfile>> {
        let doctors = self.doctors.lock().await;
        Ok(ids.iter().filter_map(|id| doctors.get(id).cloned()).collect())
    }

    async fn list_doctors(&self) -> StoreResult<Vec<DoctorProfile>> {
        let doctors = self.doctors.lock().await;
        let mut listed: Vec<DoctorProfile> = doctors.values().cloned().collect();
        listed.sort_by(|a, b| a.specialization.cmp(&b.specialization).then(a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn update_doctor(&self, profile: &DoctorProfile) -> StoreResult<bool> {
        let mut doctors = self.doctors.lock().await;
        match doctors.get_mut(&profile.id) {
            Some(existing) => {
                *existing = profile.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_doctor(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.doctors.lock().await.remove(&id).is_some())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        let mut appointments = self.appointments.lock().await;
        appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn appointment_by_id(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.appointments.lock().await.get(&id).cloned())
    }

    async fn list_appointments(&self, query: AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        let appointments = self.appointments.lock().await;
        let mut listed: Vec<Appointment> = appointments
            .values()
            .filter(|a| query.patient_id.map_or(true, |id| a.patient_id == id))
            .filter(|a| query.doctor_id.map_or(true, |id| a.doctor_id == id))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn booked_times(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<String>> {
        let appointments = self.appointments.lock().await;
        Ok(appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.date == date && a.status.occupies_slot())
            .map(|a| a.time.clone())
            .collect())
    }

    async fn set_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> StoreResult<bool> {
        let mut appointments = self.appointments.lock().await;
        match appointments.get_mut(&id) {
            Some(appointment) => {
                appointment.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_prescription(&self, id: Uuid, prescription: &Prescription) -> StoreResult<bool> {
        let mut appointments = self.appointments.lock().await;
        match appointments.get_mut(&id) {
            Some(appointment) => {
                appointment.prescription = Some(prescription.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn appointment_counts(&self) -> StoreResult<AppointmentCounts> {
        let appointments = self.appointments.lock().await;
        let mut counts = AppointmentCounts::default();
        for appointment in appointments.values() {
            counts.total += 1;
            match appointment.status {
                AppointmentStatus::Pending => counts.pending += 1,
                AppointmentStatus::Confirmed => counts.confirmed += 1,
                AppointmentStatus::Cancelled => counts.cancelled += 1,
                AppointmentStatus::Rejected => counts.rejected += 1,
                AppointmentStatus::Completed => {
                    counts.completed += 1;
                    counts.revenue += appointment.payment_amount;
                }
            }
        }
        Ok(counts)
    }
}
