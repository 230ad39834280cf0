//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Error;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn cors_builder(status: u16) -> lambda_http::http::response::Builder {
    Response::builder()
        .status(status)
        .header("access-control-allow-origin", ALLOW_ORIGIN)
        .header("access-control-allow-headers", ALLOW_HEADERS)
        .header("access-control-allow-methods", ALLOW_METHODS)
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(cors_builder(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))
        .map_err(Box::new)?)
}

/// Create an error response with the given status code and message.
pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ApiResponse::<()>::error(message))
}

/// Map a domain error onto its status code and message.
pub fn failure_response(error: &Error) -> Result<Response<Body>, lambda_http::Error> {
    error_response(error.status_code(), error.to_string())
}

/// Answer a CORS preflight request.
pub fn preflight_response() -> Result<Response<Body>, lambda_http::Error> {
    Ok(cors_builder(204).body(Body::Empty).map_err(Box::new)?)
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    if body.as_ref().is_empty() {
        return Ok(Err(error_response(400, "Missing request body")?));
    }

    match serde_json::from_slice(body.as_ref()) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: MyRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match shared::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Probe {
        name: String,
    }

    fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
        response.headers().get(name).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_error_response_shape() {
        let response = error_response(400, "bad date").unwrap();
        assert_eq!(response.status(), 400);
        assert_eq!(header(&response, "access-control-allow-origin"), "*");

        let body: serde_json::Value = serde_json::from_slice(response.body().as_ref()).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "error": "bad date"}));
    }

    #[test]
    fn test_preflight_has_cors_headers() {
        let response = preflight_response().unwrap();
        assert_eq!(response.status(), 204);
        assert_eq!(header(&response, "access-control-allow-methods"), ALLOW_METHODS);
        assert!(header(&response, "access-control-allow-headers").contains("content-type"));
    }

    #[test]
    fn test_failure_response_uses_error_status() {
        let response = failure_response(&Error::Config("FLIGHT_API_KEY not set".into())).unwrap();
        assert_eq!(response.status(), 500);
    }

    #[test]
    fn test_parse_json_body() {
        let parsed: Probe = parse_json_body(&Body::from(r#"{"name":"LH123"}"#)).unwrap().unwrap();
        assert_eq!(parsed.name, "LH123");

        let rejected = parse_json_body::<Probe>(&Body::from("{")).unwrap().unwrap_err();
        assert_eq!(rejected.status(), 400);

        let missing = parse_json_body::<Probe>(&Body::Empty).unwrap().unwrap_err();
        assert_eq!(missing.status(), 400);
    }
}
