//! Configuration management for Lambda functions.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 8;
const DEFAULT_STRIPE_API_BASE_URL: &str = "https://api.stripe.com/v1";
const DEFAULT_CURRENCY: &str = "eur";

/// Where the flight provider access key comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiKeySource {
    /// Key injected directly through the environment
    Env(String),
    /// ARN of a Secrets Manager secret holding the key
    Secret(String),
}

/// Flight-data provider configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider base URL, without the `/flights` path
    pub flight_api_base_url: String,
    /// Provider access key source
    pub flight_api_key: ApiKeySource,
    /// Upper bound for a single provider call
    pub flight_api_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flight_api_base_url = required(&lookup, "FLIGHT_API_BASE_URL")?
            .trim_end_matches('/')
            .to_string();

        let flight_api_key = match non_blank(&lookup, "FLIGHT_API_KEY") {
            Some(key) => ApiKeySource::Env(key),
            None => match non_blank(&lookup, "FLIGHT_API_KEY_SECRET_ARN") {
                Some(arn) => ApiKeySource::Secret(arn),
                None => {
                    return Err(Error::Config(
                        "FLIGHT_API_KEY or FLIGHT_API_KEY_SECRET_ARN must be set".to_string(),
                    ))
                }
            },
        };

        Ok(Self {
            flight_api_base_url,
            flight_api_key,
            flight_api_timeout: timeout(&lookup, "FLIGHT_API_TIMEOUT_SECS")?,
        })
    }
}

/// Stripe configuration for the payments function.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub stripe_secret_key: String,
    pub stripe_api_base_url: String,
    /// Currency used when a request does not name one
    pub default_currency: String,
    pub timeout: Duration,
}

impl PaymentConfig {
    /// Load payment configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            stripe_secret_key: required(&lookup, "STRIPE_SECRET_KEY")?,
            stripe_api_base_url: non_blank(&lookup, "STRIPE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            default_currency: non_blank(&lookup, "PAYMENT_CURRENCY")
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
                .to_lowercase(),
            timeout: timeout(&lookup, "STRIPE_TIMEOUT_SECS")?,
        })
    }
}

fn non_blank<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_blank(lookup, name).ok_or_else(|| Error::Config(format!("{} not set", name)))
}

fn timeout<F>(lookup: &F, name: &str) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match non_blank(lookup, name) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(Error::Config(format!(
                "{} must be a positive number of seconds, got '{}'",
                name, raw
            ))),
        },
        None => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
    }
}
