use enum_display::EnumDisplay;
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_option_number_from_string;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::user::{Identity, PartySummary};

#[derive(Debug, EnumDisplay, Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Hash)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl TryFrom<String> for DayOfWeek {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "Monday" => Ok(DayOfWeek::Monday),
            "Tuesday" => Ok(DayOfWeek::Tuesday),
            "Wednesday" => Ok(DayOfWeek::Wednesday),
            "Thursday" => Ok(DayOfWeek::Thursday),
            "Friday" => Ok(DayOfWeek::Friday),
            "Saturday" => Ok(DayOfWeek::Saturday),
            "Sunday" => Ok(DayOfWeek::Sunday),
            other => Err(format!("{} is not a day of the week", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub identity_id: Uuid,
    pub specialization: String,
    pub qualifications: Vec<String>,
    pub experience: String,
    pub fees: f64,
    pub available_days: Vec<DayOfWeek>,
    /// Opaque labels, compared only by equality.
    pub available_slots: Vec<String>,
    pub bio: Option<String>,
    pub address: String,
}

/// Qualifications arrive either as a list or as one comma-separated string.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum Qualifications {
    List(Vec<String>),
    Joined(String),
}

impl Qualifications {
    pub fn into_list(self) -> Vec<String> {
        match self {
            Qualifications::List(list) => list,
            Qualifications::Joined(joined) => joined
                .split(',')
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect(),
        }
    }
}

/// Doctor-specific fields as submitted at registration or by an admin.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DoctorFields {
    pub specialization: Option<String>,
    pub qualifications: Option<Qualifications>,
    pub experience: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub fees: Option<f64>,
    pub available_days: Option<Vec<DayOfWeek>>,
    pub available_slots: Option<Vec<String>>,
    #[serde(alias = "clinicAddress")]
    pub address: Option<String>,
    pub bio: Option<String>,
}

const MAX_BIO_LENGTH: usize = 500;

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::bad_request(format!("Please enter your {}", field)))
}

fn check_bio(bio: &Option<String>) -> Result<(), ApiError> {
    match bio {
        Some(bio) if bio.chars().count() > MAX_BIO_LENGTH => Err(ApiError::bad_request(
            "Bio cannot exceed 500 characters",
        )),
        _ => Ok(()),
    }
}

fn check_fees(fees: f64) -> Result<(), ApiError> {
    if !fees.is_finite() || fees < 0.0 {
        return Err(ApiError::bad_request("Fees must be a non-negative amount"));
    }
    Ok(())
}

impl DoctorFields {
    /// Builds a full profile; every field except the bio is mandatory.
    pub fn into_profile(self, identity_id: Uuid) -> Result<DoctorProfile, ApiError> {
        let specialization = required(self.specialization, "specialization")?;
        if specialization.trim().is_empty() {
            return Err(ApiError::bad_request("Please enter your specialization"));
        }
        let fees = required(self.fees, "consultation fees")?;
        check_fees(fees)?;
        check_bio(&self.bio)?;
        Ok(DoctorProfile {
            id: Uuid::new_v4(),
            identity_id,
            specialization: specialization.trim().to_string(),
            qualifications: required(self.qualifications, "qualifications")?.into_list(),
            experience: required(self.experience, "experience")?,
            fees,
            available_days: required(self.available_days, "available days")?,
            available_slots: required(self.available_slots, "available slots")?,
            bio: self.bio,
            address: required(self.address, "clinic address")?,
        })
    }

    /// Overwrites only the fields that were supplied.
    pub fn apply_to(self, profile: &mut DoctorProfile) -> Result<(), ApiError> {
        check_bio(&self.bio)?;
        if let Some(fees) = self.fees {
            check_fees(fees)?;
            profile.fees = fees;
        }
        if let Some(specialization) = self.specialization {
            profile.specialization = specialization.trim().to_string();
        }
        if let Some(qualifications) = self.qualifications {
            profile.qualifications = qualifications.into_list();
        }
        if let Some(experience) = self.experience {
            profile.experience = experience;
        }
        if let Some(days) = self.available_days {
            profile.available_days = days;
        }
        if let Some(slots) = self.available_slots {
            profile.available_slots = slots;
        }
        if let Some(address) = self.address {
            profile.address = address;
        }
        if self.bio.is_some() {
            profile.bio = self.bio;
        }
        Ok(())
    }
}

/// A profile joined with the display fields of its owner.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDetails {
    #[serde(flatten)]
    pub profile: DoctorProfile,
    pub name: String,
    pub email: String,
    pub is_approved: bool,
}

impl DoctorDetails {
    pub fn new(profile: DoctorProfile, identity: &Identity) -> Self {
        DoctorDetails {
            profile,
            name: identity.name.clone(),
            email: identity.email.clone(),
            is_approved: identity.is_approved,
        }
    }
}

/// The doctor side of a composed appointment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub specialization: String,
    pub fees: f64,
    pub user: Option<PartySummary>,
}

/// Optional search criteria for the public doctor directory.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorFilter {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub available_day: Option<DayOfWeek>,
}

impl DoctorFilter {
    /// Name and specialization match case-insensitive substrings; blank
    /// criteria are ignored.
    pub fn matches(&self, profile: &DoctorProfile, owner: &Identity) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle.as_deref().map(str::trim) {
                Some(needle) if !needle.is_empty() => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => true,
            }
        }

        contains(&owner.name, &self.name)
            && contains(&profile.specialization, &self.specialization)
            && self
                .available_day
                .map_or(true, |day| profile.available_days.contains(&day))
    }
}
