//! Flight-data provider client.
//!
//! Talks to an AviationStack-style `GET {base}/flights` endpoint and normalizes the
//! first match into a [`FlightRecord`]. Any provider failure (network, timeout,
//! non-2xx, malformed payload, empty result) is absorbed by [`FlightClient::fetch`],
//! which substitutes a deterministic fallback record instead.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{FlightRecord, FlightStatus};
use crate::secrets::resolve_api_key;
use crate::{Error, Result};

pub const FALLBACK_FLIGHT_NUMBER: &str = "UNK0000";
pub const FALLBACK_AIRLINE: &str = "Unknown Airline";
const FALLBACK_AIRPORT: &str = "Unknown";
const FALLBACK_DEPARTURE_HOUR: u32 = 12;
const FALLBACK_DURATION_MINUTES: i64 = 120;

/// Provider response envelope.
#[derive(Debug, Deserialize)]
struct ProviderEnvelope {
    #[serde(default)]
    data: Option<Vec<ProviderFlight>>,
    #[serde(default)]
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderFlight {
    #[serde(default)]
    flight_status: Option<String>,
    #[serde(default)]
    departure: Option<ProviderEndpoint>,
    #[serde(default)]
    arrival: Option<ProviderEndpoint>,
    #[serde(default)]
    airline: Option<ProviderAirline>,
    #[serde(default)]
    flight: Option<ProviderFlightId>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderEndpoint {
    airport: Option<String>,
    iata: Option<String>,
    terminal: Option<String>,
    gate: Option<String>,
    scheduled: Option<String>,
    actual: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderAirline {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderFlightId {
    iata: Option<String>,
}

/// Client for the flight-data provider.
#[derive(Clone)]
pub struct FlightClient {
    http_client: reqwest::Client,
    base_url: String,
    access_key: String,
}

impl FlightClient {
    /// Create a client whose every provider call is bounded by `timeout`.
    pub fn new(base_url: &str, access_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.into(),
        })
    }

    /// Build a client from configuration, resolving the access key first.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let access_key = resolve_api_key(&config.flight_api_key).await?;
        Self::new(&config.flight_api_base_url, access_key, config.flight_api_timeout)
    }

    /// Resolve a flight record, falling back to a synthetic one on any provider failure.
    pub async fn fetch(&self, flight_number: &str, date: NaiveDate) -> FlightRecord {
        match self.try_fetch(flight_number, date).await {
            Ok(record) => {
                info!(
                    flight_number = %record.flight_number,
                    status = ?record.status,
                    "Flight resolved from provider"
                );
                record
            }
            Err(e) => {
                warn!(flight_number, %date, error = %e, "Using fallback flight record");
                fallback_record(date)
            }
        }
    }

    /// Single provider call. Errors are always `Error::Provider`.
    pub async fn try_fetch(&self, flight_number: &str, date: NaiveDate) -> Result<FlightRecord> {
        let flight_date = date.format("%Y-%m-%d").to_string();

        let response = self
            .http_client
            .get(format!("{}/flights", self.base_url))
            .query(&[
                ("access_key", self.access_key.as_str()),
                ("flight_iata", flight_number),
                ("flight_date", flight_date.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                // The URL carries the access key.
                let e = e.without_url();
                if e.is_timeout() {
                    Error::Provider(format!("request timed out: {}", e))
                } else {
                    Error::Provider(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Provider(format!("provider returned {}", status)));
        }

        let envelope: ProviderEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed payload: {}", e.without_url())))?;

        if let Some(err) = envelope.error {
            let code = err.code.map(|c| c.to_string()).unwrap_or_default();
            return Err(Error::Provider(format!(
                "provider error {}: {}",
                code,
                err.message.unwrap_or_default()
            )));
        }

        let flight = envelope
            .data
            .and_then(|flights| flights.into_iter().next())
            .ok_or_else(|| Error::Provider(format!("no flight found for {} on {}", flight_number, date)))?;

        normalize(flight, flight_number)
    }
}

/// Synthetic record used when live data is unavailable.
pub fn fallback_record(date: NaiveDate) -> FlightRecord {
    let departure_time = date
        .and_hms_opt(FALLBACK_DEPARTURE_HOUR, 0, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::default()))
        .and_utc()
        .fixed_offset();

    FlightRecord {
        flight_number: FALLBACK_FLIGHT_NUMBER.to_string(),
        airline: FALLBACK_AIRLINE.to_string(),
        departure_time,
        arrival_time: departure_time + TimeDelta::minutes(FALLBACK_DURATION_MINUTES),
        departure_airport: FALLBACK_AIRPORT.to_string(),
        arrival_airport: FALLBACK_AIRPORT.to_string(),
        terminal: None,
        gate: None,
        arrival_terminal: None,
        arrival_gate: None,
        status: FlightStatus::Unknown,
        actual_departure_time: None,
        actual_arrival_time: None,
    }
}

fn normalize(flight: ProviderFlight, requested_flight_number: &str) -> Result<FlightRecord> {
    let departure = flight.departure.unwrap_or_default();
    let arrival = flight.arrival.unwrap_or_default();

    let departure_time = required_timestamp(departure.scheduled.as_deref(), "departure.scheduled")?;
    let arrival_time = required_timestamp(arrival.scheduled.as_deref(), "arrival.scheduled")?;
    if departure_time >= arrival_time {
        return Err(Error::Provider(format!(
            "malformed payload: departure {} is not before arrival {}",
            departure_time, arrival_time
        )));
    }

    let flight_number = flight
        .flight
        .and_then(|f| f.iata)
        .filter(|iata| !iata.trim().is_empty())
        .unwrap_or_else(|| requested_flight_number.to_string());

    let airline = flight
        .airline
        .and_then(|a| a.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_AIRLINE.to_string());

    Ok(FlightRecord {
        flight_number,
        airline,
        departure_time,
        arrival_time,
        departure_airport: airport_label(departure.airport, departure.iata),
        arrival_airport: airport_label(arrival.airport, arrival.iata),
        terminal: departure.terminal,
        gate: departure.gate,
        arrival_terminal: arrival.terminal,
        arrival_gate: arrival.gate,
        status: FlightStatus::from_provider(flight.flight_status.as_deref()),
        actual_departure_time: optional_timestamp(departure.actual.as_deref()),
        actual_arrival_time: optional_timestamp(arrival.actual.as_deref()),
    })
}

fn required_timestamp(raw: Option<&str>, field: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.ok_or_else(|| Error::Provider(format!("malformed payload: missing {}", field)))?;
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| Error::Provider(format!("malformed payload: bad {} '{}': {}", field, raw, e)))
}

fn optional_timestamp(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    raw.and_then(|r| DateTime::parse_from_rfc3339(r).ok())
}

fn airport_label(name: Option<String>, iata: Option<String>) -> String {
    match (name, iata) {
        (Some(name), Some(iata)) => format!("{} ({})", name, iata),
        (Some(name), None) => name,
        (None, Some(iata)) => iata,
        (None, None) => FALLBACK_AIRPORT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 20).unwrap()
    }

    fn provider_flight() -> serde_json::Value {
        json!({
            "flight_date": "2024-12-20",
            "flight_status": "scheduled",
            "departure": {
                "airport": "Frankfurt International",
                "iata": "FRA",
                "terminal": "1",
                "gate": "B44",
                "scheduled": "2024-12-20T14:00:00+01:00",
                "estimated": "2024-12-20T14:00:00+01:00",
                "actual": null
            },
            "arrival": {
                "airport": "John F Kennedy International",
                "iata": "JFK",
                "terminal": "4",
                "gate": "A7",
                "scheduled": "2024-12-20T17:05:00-05:00",
                "estimated": "2024-12-20T17:05:00-05:00",
                "actual": null
            },
            "airline": { "name": "Lufthansa", "iata": "LH" },
            "flight": { "number": "400", "iata": "LH400", "icao": "DLH400" }
        })
    }

    async fn client_for(server: &MockServer) -> FlightClient {
        FlightClient::new(&server.uri(), "test-key", Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_normalizes_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flights"))
            .and(query_param("access_key", "test-key"))
            .and(query_param("flight_iata", "LH400"))
            .and(query_param("flight_date", "2024-12-20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [provider_flight()] })))
            .expect(1)
            .mount(&server)
            .await;

        let record = client_for(&server).await.fetch("LH400", date()).await;

        assert_eq!(record.flight_number, "LH400");
        assert_eq!(record.airline, "Lufthansa");
        assert_eq!(record.departure_airport, "Frankfurt International (FRA)");
        assert_eq!(record.arrival_airport, "John F Kennedy International (JFK)");
        assert_eq!(record.terminal.as_deref(), Some("1"));
        assert_eq!(record.gate.as_deref(), Some("B44"));
        assert_eq!(record.arrival_terminal.as_deref(), Some("4"));
        assert_eq!(record.arrival_gate.as_deref(), Some("A7"));
        assert_eq!(record.status, FlightStatus::Scheduled);
        assert!(!record.is_fallback());
    }

    #[tokio::test]
    async fn test_arrival_terminal_differs_from_departure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [provider_flight()] })))
            .mount(&server)
            .await;

        let record = client_for(&server).await.try_fetch("LH400", date()).await.unwrap();
        assert_eq!(record.terminal.as_deref(), Some("1"));
        assert_eq!(record.arrival_terminal.as_deref(), Some("4"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["gate"], "B44");
        assert_eq!(json["arrival_gate"], "A7");
    }

    #[tokio::test]
    async fn test_timestamps_keep_original_instant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [provider_flight()] })))
            .mount(&server)
            .await;

        let record = client_for(&server).await.try_fetch("LH400", date()).await.unwrap();

        let departure = DateTime::parse_from_rfc3339("2024-12-20T14:00:00+01:00").unwrap();
        let arrival = DateTime::parse_from_rfc3339("2024-12-20T17:05:00-05:00").unwrap();
        assert_eq!(record.departure_time.timestamp(), departure.timestamp());
        assert_eq!(record.arrival_time.timestamp(), arrival.timestamp());
        assert_eq!(record.departure_time.to_rfc3339(), "2024-12-20T14:00:00+01:00");

        let serialized = serde_json::to_string(&record).unwrap();
        let back: FlightRecord = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back.departure_time, record.departure_time);
        assert_eq!(back.arrival_time.offset(), record.arrival_time.offset());
    }

    #[tokio::test]
    async fn test_server_error_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(client.try_fetch("LH400", date()).await, Err(Error::Provider(_))));

        let record = client.fetch("LH400", date()).await;
        assert_eq!(record, fallback_record(date()));
        assert_eq!(record.status, FlightStatus::Unknown);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [provider_flight()] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let record = client_for(&server).await.fetch("LH400", date()).await;
        assert!(record.is_fallback());
    }

    #[tokio::test]
    async fn test_empty_and_malformed_payloads_fall_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("flight_iata", "XX1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("flight_iata", "XX2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("flight_iata", "XX3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "code": "invalid_access_key", "message": "You have not supplied a valid API Access Key." }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        for code in ["XX1", "XX2", "XX3"] {
            assert!(client.fetch(code, date()).await.is_fallback(), "{} should fall back", code);
        }
    }

    #[tokio::test]
    async fn test_inverted_schedule_is_malformed() {
        let server = MockServer::start().await;
        let mut flight = provider_flight();
        flight["arrival"]["scheduled"] = json!("2024-12-20T12:00:00+01:00");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [flight] })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.try_fetch("LH400", date()).await.unwrap_err();
        assert!(err.to_string().contains("not before arrival"));
    }

    #[test]
    fn test_fallback_record_is_deterministic() {
        let record = fallback_record(date());
        assert_eq!(record.flight_number, "UNK0000");
        assert_eq!(record.airline, "Unknown Airline");
        assert_eq!(record.departure_time.to_rfc3339(), "2024-12-20T12:00:00+00:00");
        assert_eq!(record.arrival_time - record.departure_time, TimeDelta::hours(2));
        assert!(record.is_fallback());
    }
}
