use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::Repository;

/// Slots of `configured` not present in `booked`, in configured order.
pub fn free_slots(configured: &[String], booked: &[String]) -> Vec<String> {
    configured
        .iter()
        .filter(|slot| !booked.contains(slot))
        .cloned()
        .collect()
}

#[tracing::instrument(name = "Computing doctor availability", skip(store))]
pub async fn doctor_availability(
    store: &dyn Repository,
    doctor_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<String>, ApiError> {
    let doctor = store
        .doctor_by_id(doctor_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))?;
    let booked = store.booked_times(doctor_id, date).await?;
    Ok(free_slots(&doctor.available_slots, &booked))
}
