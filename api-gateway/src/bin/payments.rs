//! Payments Lambda - Creates Stripe PaymentIntents for the booking wizard.
//!
//! Endpoints:
//! - POST /payments/intent - Create a PaymentIntent and return its client secret
//! - OPTIONS * - CORS preflight

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{error_response, failure_response, json_response, preflight_response};
use shared::{parse_body, ApiResponse, PaymentConfig, PaymentIntentBody, StripeClient};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Application state. Only a successfully built client is kept.
struct AppState {
    config: shared::Result<PaymentConfig>,
    stripe_client: OnceCell<StripeClient>,
}

impl AppState {
    fn new(config: shared::Result<PaymentConfig>) -> Self {
        if let Err(e) = &config {
            error!("Payment configuration invalid: {}", e);
        }

        Self {
            config,
            stripe_client: OnceCell::new(),
        }
    }

    async fn stripe_client(&self) -> Result<Result<&StripeClient, Response<Body>>, Error> {
        let config = match &self.config {
            Ok(config) => config,
            Err(e) => return Ok(Err(failure_response(e)?)),
        };

        match self
            .stripe_client
            .get_or_try_init(|| async { StripeClient::new(config) })
            .await
        {
            Ok(client) => Ok(Ok(client)),
            Err(e) => {
                error!("Stripe client unavailable: {}", e);
                Ok(Err(failure_response(&e)?))
            }
        }
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let raw_path = event.uri().path();
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path).trim_end_matches('/');
    let method = event.method().as_str();

    match (method, path) {
        ("OPTIONS", _) => preflight_response(),

        ("POST", "/payments/intent") => {
            let client = match state.stripe_client().await? {
                Ok(client) => client,
                Err(response) => return Ok(response),
            };

            let body: PaymentIntentBody = parse_body!(event.body());
            match client.create_payment_intent(body).await {
                Ok(intent) => json_response(200, &ApiResponse::success(intent)),
                Err(e) => {
                    warn!("PaymentIntent request failed: {}", e);
                    failure_response(&e)
                }
            }
        }

        (_, "/payments/intent") => error_response(405, "Method not allowed"),
        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new(PaymentConfig::from_env()));

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
