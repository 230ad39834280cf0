//! AWS Secrets Manager integration for provider credentials.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::config::ApiKeySource;
use crate::{Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// JSON shape accepted for the flight provider secret.
#[derive(Debug, Deserialize)]
struct AccessKeySecret {
    #[serde(alias = "api_key", alias = "FLIGHT_API_KEY")]
    access_key: String,
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Extract the access key from a secret string.
///
/// Accepts either a bare key or a JSON object with an `access_key` field.
pub fn parse_access_key(secret_string: &str) -> Result<String> {
    let trimmed = secret_string.trim();
    let key = if trimmed.starts_with('{') {
        serde_json::from_str::<AccessKeySecret>(trimmed)
            .map_err(|e| Error::Config(format!("Failed to parse flight API secret: {}", e)))?
            .access_key
    } else {
        trimmed.to_string()
    };

    if key.trim().is_empty() {
        return Err(Error::Config("Flight API secret is empty".to_string()));
    }
    Ok(key)
}

/// Resolve the provider access key from its configured source.
///
/// Secrets Manager is only contacted when the key is not injected directly.
pub async fn resolve_api_key(source: &ApiKeySource) -> Result<String> {
    match source {
        ApiKeySource::Env(key) => Ok(key.clone()),
        ApiKeySource::Secret(arn) => {
            let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = SecretsClient::new(&config);
            let secret_string = get_secret(&client, arn).await?;
            parse_access_key(&secret_string)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_secret() {
        let key = parse_access_key(r#"{"access_key":"abc123"}"#).unwrap();
        assert_eq!(key, "abc123");
    }

    #[test]
    fn test_parse_raw_secret() {
        assert_eq!(parse_access_key("  abc123\n").unwrap(), "abc123");
    }

    #[test]
    fn test_parse_empty_secret() {
        assert!(matches!(parse_access_key("   "), Err(Error::Config(_))));
        assert!(matches!(parse_access_key(r#"{"access_key":""}"#), Err(Error::Config(_))));
        assert!(matches!(parse_access_key(r#"{"token":"x"}"#), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_env_source_skips_secrets_manager() {
        let key = resolve_api_key(&ApiKeySource::Env("direct".to_string())).await.unwrap();
        assert_eq!(key, "direct");
    }
}
