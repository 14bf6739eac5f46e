use std::collections::HashMap;

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{DoctorDetails, DoctorFilter, DoctorProfile, Identity};
use crate::store::Repository;

async fn profiles_with_owners(
    store: &dyn Repository,
) -> Result<Vec<(DoctorProfile, Identity)>, ApiError> {
    let profiles = store.list_doctors().await?;
    let owner_ids: Vec<Uuid> = profiles.iter().map(|p| p.identity_id).collect();
    let mut owners: HashMap<Uuid, Identity> = store
        .identities_by_ids(&owner_ids)
        .await?
        .into_iter()
        .map(|identity| (identity.id, identity))
        .collect();
    Ok(profiles
        .into_iter()
        .filter_map(|profile| {
            let owner = owners.remove(&profile.identity_id)?;
            Some((profile, owner))
        })
        .collect())
}

/// Doctors patients may book: the owner must be approved and not blocked.
#[tracing::instrument(name = "Searching doctors", skip(store))]
pub async fn search_doctors(
    store: &dyn Repository,
    filter: &DoctorFilter,
) -> Result<Vec<DoctorDetails>, ApiError> {
    Ok(profiles_with_owners(store)
        .await?
        .into_iter()
        .filter(|(profile, owner)| {
            owner.is_approved && !owner.is_blocked && filter.matches(profile, owner)
        })
        .map(|(profile, owner)| DoctorDetails::new(profile, &owner))
        .collect())
}

/// Every profile with its owner, regardless of approval.
pub async fn all_doctors(store: &dyn Repository) -> Result<Vec<DoctorDetails>, ApiError> {
    Ok(profiles_with_owners(store)
        .await?
        .into_iter()
        .map(|(profile, owner)| DoctorDetails::new(profile, &owner))
        .collect())
}

#[tracing::instrument(name = "Fetching doctor details", skip(store))]
pub async fn doctor_details(store: &dyn Repository, id: Uuid) -> Result<DoctorDetails, ApiError> {
    let profile = store
        .doctor_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))?;
    let owner = store
        .identity_by_id(profile.identity_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Doctor not found"))?;
    Ok(DoctorDetails::new(profile, &owner))
}
