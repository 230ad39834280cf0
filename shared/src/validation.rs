//! Lead-time policy for airport transfers.
//!
//! Drop-offs must reach the passenger at most 90 minutes (plus a 30 minute early
//! tolerance) and at least 0 minutes before scheduled departure. Pickups must be at
//! least 30 minutes after scheduled arrival. Requested times are read in the UTC
//! offset of the flight event they are compared with.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use tracing::info;
use validator::Validate;

use crate::flights::FlightClient;
use crate::models::{
    BookingType, FlightLookupResponse, FlightRecord, ValidateFlightBody, ValidateFlightResponse,
    ValidationRequest, ValidationResult,
};
use crate::{Error, Result};

pub const DROPOFF_LEAD_MINUTES: i64 = 90;
pub const DROPOFF_EARLY_TOLERANCE_MINUTES: i64 = 30;
pub const PICKUP_BUFFER_MINUTES: i64 = 30;

const UNVERIFIED_NOTE: &str = "flight not found; based on unverified schedule";
const UNVERIFIED_VERDICT: &str = "flight not found; verdict based on unverified schedule";

enum Verdict {
    Valid,
    Invalid {
        reason: &'static str,
        suggested: DateTime<FixedOffset>,
    },
}

/// Check a requested service time against a resolved flight.
pub fn validate(request: &ValidationRequest, flight: &FlightRecord) -> ValidationResult {
    let verdict = match request.booking_type {
        BookingType::Dropoff => check_dropoff(request, flight.departure_time),
        BookingType::Pickup => check_pickup(request, flight.arrival_time),
    };
    let unverified = flight.is_fallback();

    match verdict {
        Verdict::Valid => ValidationResult {
            is_valid: true,
            reason: unverified.then(|| UNVERIFIED_VERDICT.to_string()),
            suggested_time: None,
            suggested_date: None,
            flight_info: Some(flight.clone()),
        },
        Verdict::Invalid { reason, suggested } => ValidationResult {
            is_valid: false,
            reason: Some(if unverified {
                format!("{} ({})", reason, UNVERIFIED_NOTE)
            } else {
                reason.to_string()
            }),
            suggested_time: Some(suggested.format("%H:%M").to_string()),
            suggested_date: Some(suggested.format("%Y-%m-%d").to_string()),
            flight_info: Some(flight.clone()),
        },
    }
}

fn check_dropoff(request: &ValidationRequest, departure: DateTime<FixedOffset>) -> Verdict {
    let requested = requested_at(request, departure);
    let suggested = departure - TimeDelta::minutes(DROPOFF_LEAD_MINUTES);
    let earliest = suggested - TimeDelta::minutes(DROPOFF_EARLY_TOLERANCE_MINUTES);

    if requested > departure {
        Verdict::Invalid { reason: "too late", suggested }
    } else if requested < earliest {
        Verdict::Invalid { reason: "too early", suggested }
    } else {
        Verdict::Valid
    }
}

fn check_pickup(request: &ValidationRequest, arrival: DateTime<FixedOffset>) -> Verdict {
    let requested = requested_at(request, arrival);
    let earliest = arrival + TimeDelta::minutes(PICKUP_BUFFER_MINUTES);

    if requested < earliest {
        Verdict::Invalid {
            reason: "too early relative to arrival",
            suggested: earliest,
        }
    } else {
        Verdict::Valid
    }
}

/// The requested wall-clock time placed in the flight event's offset.
fn requested_at(request: &ValidationRequest, event: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let naive = request.date.and_time(request.time);
    let offset = event.timezone();
    // A fixed offset never yields an ambiguous or skipped local time.
    naive
        .and_local_timezone(offset)
        .single()
        .unwrap_or_else(|| naive.and_utc().with_timezone(&offset))
}

/// Turn the raw request body into a typed request.
pub fn parse_request(body: ValidateFlightBody) -> Result<ValidationRequest> {
    body.validate()?;

    Ok(ValidationRequest {
        flight_number: normalize_flight_number(&body.flight_number)?,
        date: parse_date(&body.date)?,
        time: parse_time(&body.time)?,
        booking_type: body.booking_type,
    })
}

/// Uppercase and strip whitespace, then require an IATA designator such as `LH400` or `U21234A`.
pub fn normalize_flight_number(raw: &str) -> Result<String> {
    let code: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let invalid = || Error::Validation(format!("Invalid flight number '{}'", raw.trim()));

    if !code.is_ascii() || code.len() < 3 {
        return Err(invalid());
    }

    let (airline, rest) = code.split_at(2);
    let airline_ok = airline.chars().all(|c| c.is_ascii_alphanumeric())
        && !airline.chars().all(|c| c.is_ascii_digit());

    let digits = rest.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let suffix_len = rest.len() - digits.len();
    let number_ok = (1..=4).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && suffix_len <= 1;

    if airline_ok && number_ok {
        Ok(code)
    } else {
        Err(invalid())
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Invalid date '{}': expected YYYY-MM-DD", raw)))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw_trimmed = raw.trim();
    NaiveTime::parse_from_str(raw_trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw_trimmed, "%H:%M:%S"))
        .map_err(|_| Error::Validation(format!("Invalid time '{}': expected HH:MM", raw)))
}

/// Validate a booking form submission against live flight data.
///
/// Provider failures never surface here: the fetcher substitutes the fallback
/// record and `flight_found` reports it.
pub async fn check_booking(client: &FlightClient, body: ValidateFlightBody) -> Result<ValidateFlightResponse> {
    let request = parse_request(body)?;
    let flight = client.fetch(&request.flight_number, request.date).await;
    let flight_found = !flight.is_fallback();
    let validation_result = validate(&request, &flight);

    info!(
        flight_number = %request.flight_number,
        booking_type = ?request.booking_type,
        flight_found,
        is_valid = validation_result.is_valid,
        "Flight time validated"
    );

    Ok(ValidateFlightResponse {
        success: true,
        flight_found,
        validation_result,
    })
}

/// Resolve a flight for display in the booking form.
pub async fn lookup_flight(client: &FlightClient, flight_number: &str, date: &str) -> Result<FlightLookupResponse> {
    let flight_number = normalize_flight_number(flight_number)?;
    let date = parse_date(date)?;
    let flight = client.fetch(&flight_number, date).await;

    Ok(FlightLookupResponse {
        success: true,
        flight_found: !flight.is_fallback(),
        data: flight,
    })
}
