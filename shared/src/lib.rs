//! Shared library for the airport transfer booking Lambda functions.
//!
//! This crate provides configuration, error types, HTTP helpers, the flight-data
//! client, the lead-time validator and the Stripe client used by the Lambdas.

pub mod config;
pub mod error;
pub mod flights;
pub mod http;
pub mod models;
pub mod payments;
pub mod secrets;
pub mod validation;

pub use config::{ApiKeySource, Config, PaymentConfig};
pub use error::{Error, Result};
pub use flights::{fallback_record, FlightClient};
pub use http::ApiResponse;
pub use models::{
    BookingType, FlightLookupResponse, FlightRecord, FlightStatus, ValidateFlightBody,
    ValidateFlightResponse, ValidationRequest, ValidationResult,
};
pub use payments::{PaymentIntentBody, PaymentIntentResponse, StripeClient};
pub use secrets::{get_secret, resolve_api_key};
pub use validation::{check_booking, lookup_flight, validate};
