use chrono::{DateTime, NaiveDate, Utc};
use enum_display::EnumDisplay;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::doctor::DoctorSummary;
use crate::models::user::PartySummary;

/// `approved` is an older name for `confirmed`; it is accepted on input and
/// never emitted.
#[derive(Debug, EnumDisplay, Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Hash)]
#[enum_display(case = "Lower")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    #[serde(alias = "approved")]
    Confirmed,
    Cancelled,
    Rejected,
    Completed,
}

impl AppointmentStatus {
    /// States reachable in one step.
    pub fn next_states(&self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled, Rejected],
            Confirmed => &[Completed, Cancelled],
            Cancelled | Rejected | Completed => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }

    /// Whether the appointment still holds its slot.
    pub fn occupies_slot(&self) -> bool {
        *self != AppointmentStatus::Cancelled
    }

    pub fn accepts_prescription(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Completed
        )
    }
}

impl TryFrom<String> for AppointmentStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" | "approved" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "rejected" => Ok(AppointmentStatus::Rejected),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(format!("{} is not a valid appointment status", other)),
        }
    }
}

#[derive(Debug, EnumDisplay, Serialize, Deserialize, PartialEq, Eq, Copy, Clone)]
#[enum_display(case = "Lower")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl TryFrom<String> for PaymentStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("{} is not a valid payment status", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub diagnosis: Option<String>,
    pub medications: Option<String>,
    pub instructions: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub symptoms: String,
    pub prescription: Option<Prescription>,
    pub payment_status: PaymentStatus,
    pub payment_amount: f64,
    pub created_at: DateTime<Utc>,
}

/// An appointment joined with the display fields of both parties. Either
/// side is `None` when the referenced record no longer exists.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: Uuid,
    pub patient: Option<PartySummary>,
    pub doctor: Option<DoctorSummary>,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub symptoms: String,
    pub prescription: Option<Prescription>,
    pub payment_status: PaymentStatus,
    pub payment_amount: f64,
    pub created_at: DateTime<Utc>,
}
