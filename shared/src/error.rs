//! Error types for the booking Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the booking Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration missing or unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Flight-data provider failure. Recovered inside the fetcher.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Payment provider rejected the request or was unreachable
    #[error("Payment error: {0}")]
    Payment(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Outbound HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Provider(_) | Error::Payment(_) | Error::Http(_) => 502,
            _ => 500,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Validation("bad date".into()).status_code(), 400);
        assert_eq!(Error::Config("FLIGHT_API_KEY not set".into()).status_code(), 500);
        assert_eq!(Error::Payment("card declined".into()).status_code(), 502);
    }
}
