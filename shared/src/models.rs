//! Shared data models.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::flights::FALLBACK_FLIGHT_NUMBER;

/// Flight status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Active,
    Landed,
    Cancelled,
    Unknown,
}

impl FlightStatus {
    /// Map a provider status string. Anything unrecognised is `Unknown`.
    pub fn from_provider(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("scheduled") => FlightStatus::Scheduled,
            Some("active") | Some("en-route") => FlightStatus::Active,
            Some("landed") => FlightStatus::Landed,
            Some("cancelled") | Some("canceled") => FlightStatus::Cancelled,
            _ => FlightStatus::Unknown,
        }
    }
}

/// Normalized flight snapshot. Lives for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub flight_number: String,
    pub airline: String,
    /// Scheduled departure
    pub departure_time: DateTime<FixedOffset>,
    /// Scheduled arrival
    pub arrival_time: DateTime<FixedOffset>,
    pub departure_airport: String,
    pub arrival_airport: String,
    /// Departure terminal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    /// Departure gate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
    /// Where a pickup meets the passenger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_gate: Option<String>,
    pub status: FlightStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_departure_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_arrival_time: Option<DateTime<FixedOffset>>,
}

impl FlightRecord {
    /// True for the synthetic record substituted when live data is unavailable.
    pub fn is_fallback(&self) -> bool {
        self.status == FlightStatus::Unknown && self.flight_number == FALLBACK_FLIGHT_NUMBER
    }
}

/// Whether the vehicle meets an arriving flight or delivers to a departing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    #[serde(alias = "pick-up", alias = "pick_up")]
    Pickup,
    #[serde(alias = "drop-off", alias = "drop_off")]
    Dropoff,
}

/// Validation endpoint request body, as sent by the booking form.
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateFlightBody {
    #[validate(length(min = 3, max = 10, message = "flight_number must be 3-10 characters"))]
    pub flight_number: String,
    #[validate(length(equal = 10, message = "date must be YYYY-MM-DD"))]
    pub date: String,
    #[validate(length(min = 4, max = 8, message = "time must be HH:MM"))]
    pub time: String,
    pub booking_type: BookingType,
}

/// Parsed caller input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRequest {
    /// Normalized IATA flight designator
    pub flight_number: String,
    pub date: NaiveDate,
    /// Requested local service time
    pub time: NaiveTime,
    pub booking_type: BookingType,
}

/// Outcome of checking a requested service time against a flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// `HH:MM` in the flight event's offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_time: Option<String>,
    /// `YYYY-MM-DD` in the flight event's offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_info: Option<FlightRecord>,
}

/// Validation endpoint response payload.
#[derive(Debug, Serialize)]
pub struct ValidateFlightResponse {
    pub success: bool,
    /// False when `flight_info` is the synthetic fallback
    pub flight_found: bool,
    pub validation_result: ValidationResult,
}

/// Flight lookup endpoint response payload.
#[derive(Debug, Serialize)]
pub struct FlightLookupResponse {
    pub success: bool,
    pub flight_found: bool,
    pub data: FlightRecord,
}
