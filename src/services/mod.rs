pub mod accounts;
pub mod admin;
pub mod appointments;
pub mod availability;
pub mod directory;

use chrono::{DateTime, NaiveDate};

use crate::error::ApiError;

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only its date.
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate, ApiError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(input).map(|dt| dt.date_naive()))
        .map_err(|_| ApiError::BadRequest(format!("{} is not a valid date", input)))
}
