//! Stripe PaymentIntent creation for the booking wizard's payment step.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::config::PaymentConfig;
use crate::{Error, Result};

/// Payment intent request body.
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentIntentBody {
    /// Amount in minor units (cents)
    #[validate(range(min = 50, max = 99999999, message = "amount must be between 50 and 99999999 minor units"))]
    pub amount: i64,
    #[validate(length(equal = 3, message = "currency must be a 3-letter ISO code"))]
    pub currency: Option<String>,
    #[validate(email(message = "customer_email is not a valid email address"))]
    pub customer_email: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub booking_reference: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// What the payment form needs to confirm the intent client-side.
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Minimal Stripe REST client.
pub struct StripeClient {
    http_client: reqwest::Client,
    base_url: String,
    secret_key: String,
    default_currency: String,
}

impl StripeClient {
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        Ok(Self {
            http_client: reqwest::Client::builder().timeout(config.timeout).build()?,
            base_url: config.stripe_api_base_url.clone(),
            secret_key: config.stripe_secret_key.clone(),
            default_currency: config.default_currency.clone(),
        })
    }

    /// Create a PaymentIntent. Single attempt; the idempotency key only guards
    /// against Stripe-side duplication of this one call.
    pub async fn create_payment_intent(&self, body: PaymentIntentBody) -> Result<PaymentIntentResponse> {
        body.validate()?;

        let currency = body
            .currency
            .as_deref()
            .unwrap_or(self.default_currency.as_str())
            .to_ascii_lowercase();
        if !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Validation(format!("Invalid currency '{}'", currency)));
        }

        let mut params: Vec<(&str, String)> = vec![
            ("amount", body.amount.to_string()),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        if let Some(email) = body.customer_email {
            params.push(("receipt_email", email));
        }
        if let Some(description) = body.description {
            params.push(("description", description));
        }
        if let Some(reference) = body.booking_reference {
            params.push(("metadata[booking_reference]", reference));
        }

        let response = self
            .http_client
            .post(format!("{}/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Payment(format!("Stripe request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = stripe_error_message(status, &error_text);
            error!("PaymentIntent creation failed: {}", message);
            return Err(Error::Payment(message));
        }

        let intent: StripePaymentIntent = response
            .json()
            .await
            .map_err(|e| Error::Payment(format!("Failed to parse Stripe response: {}", e)))?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| Error::Payment("Stripe response missing client_secret".to_string()))?;

        info!(payment_intent_id = %intent.id, amount = intent.amount, "PaymentIntent created");

        Ok(PaymentIntentResponse {
            payment_intent_id: intent.id,
            client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        })
    }
}

fn stripe_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<StripeErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "{} ({})",
            envelope.error.message.unwrap_or_else(|| "Stripe rejected the request".to_string()),
            envelope.error.kind.unwrap_or_else(|| status.to_string())
        ),
        Err(_) => format!("Stripe returned {}", status),
    }
}
