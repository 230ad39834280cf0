//! Flights Lambda - Flight lookup and service-time validation for the booking wizard.
//!
//! Endpoints:
//! - POST /validate-flight - Check a requested pickup/drop-off time against the flight schedule
//! - GET /flights/{flight_number}?date=YYYY-MM-DD - Resolve a flight for display
//! - OPTIONS * - CORS preflight

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use shared::http::{error_response, failure_response, json_response, preflight_response};
use shared::{check_booking, lookup_flight, parse_body, Config, FlightClient, ValidateFlightBody};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state.
///
/// A configuration failure is kept and reported on every request. The client is
/// built on first use and only kept once built, so a failed secret read is retried.
struct AppState {
    config: shared::Result<Config>,
    flight_client: OnceCell<FlightClient>,
}

impl AppState {
    fn new(config: shared::Result<Config>) -> Self {
        if let Err(e) = &config {
            error!("Flight configuration invalid: {}", e);
        }

        Self {
            config,
            flight_client: OnceCell::new(),
        }
    }

    /// Returns `Ok(Err(response))` when the client is unavailable, like `parse_json_body`.
    async fn flight_client(&self) -> Result<Result<&FlightClient, Response<Body>>, Error> {
        self.client_with(FlightClient::from_config).await
    }

    async fn client_with<'a, F, Fut>(&'a self, init: F) -> Result<Result<&'a FlightClient, Response<Body>>, Error>
    where
        F: FnOnce(&'a Config) -> Fut,
        Fut: Future<Output = shared::Result<FlightClient>>,
    {
        let config = match &self.config {
            Ok(config) => config,
            Err(e) => return Ok(Err(failure_response(e)?)),
        };

        match self.flight_client.get_or_try_init(|| init(config)).await {
            Ok(client) => Ok(Ok(client)),
            Err(e) => {
                error!("Flight client unavailable, retrying on next request: {}", e);
                Ok(Err(failure_response(&e)?))
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Route<'a> {
    Validate,
    Flight(&'a str),
    NotFound,
}

fn route(path: &str) -> Route<'_> {
    // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
    let path = path.strip_prefix("/api").unwrap_or(path).trim_end_matches('/');

    if path == "/validate-flight" {
        return Route::Validate;
    }

    match path.strip_prefix("/flights/") {
        Some(flight_number) if !flight_number.is_empty() && !flight_number.contains('/') => {
            Route::Flight(flight_number)
        }
        _ => Route::NotFound,
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    if method == "OPTIONS" {
        return preflight_response();
    }

    match (method, route(event.uri().path())) {
        ("POST", Route::Validate) => {
            let client = match state.flight_client().await? {
                Ok(client) => client,
                Err(response) => return Ok(response),
            };

            let body: ValidateFlightBody = parse_body!(event.body());
            match check_booking(client, body).await {
                Ok(response) => json_response(200, &response),
                Err(e) => {
                    warn!("Rejected validation request: {}", e);
                    failure_response(&e)
                }
            }
        }

        ("GET", Route::Flight(encoded)) => {
            let client = match state.flight_client().await? {
                Ok(client) => client,
                Err(response) => return Ok(response),
            };

            let Ok(flight_number) = urlencoding::decode(encoded) else {
                return error_response(400, format!("Invalid flight number '{}'", encoded));
            };

            let params = event.query_string_parameters();
            let Some(date) = params.first("date") else {
                return error_response(400, "Missing date query parameter");
            };

            info!("Looking up flight {} on {}", flight_number, date);
            match lookup_flight(client, &flight_number, date).await {
                Ok(response) => json_response(200, &response),
                Err(e) => failure_response(&e),
            }
        }

        (_, Route::NotFound) => error_response(404, "Not found"),
        _ => error_response(405, "Method not allowed"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new(Config::from_env()));

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
