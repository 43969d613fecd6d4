//! Stripe payment intents client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{PaymentError, PaymentIntent, PaymentMetadata, PaymentProvider};
use crate::config::PaymentConfig;

/// Stripe API version pinned for request and response shapes.
const API_VERSION: &str = "2024-06-20";

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Creates payment intents through the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    endpoint: String,
    currency: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("endpoint", &self.endpoint)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` if no secret key is set, or an
    /// error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let secret_key = config
            .secret_key
            .as_ref()
            .ok_or(PaymentError::NotConfigured)?;

        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("Invalid secret key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);
        headers.insert("Stripe-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/payment_intents", config.api_base.trim_end_matches('/')),
            currency: config.currency.clone(),
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_intent(
        &self,
        amount_minor: i64,
        metadata: PaymentMetadata,
    ) -> Result<PaymentIntent, PaymentError> {
        let form = [
            ("amount", amount_minor.to_string()),
            ("currency", self.currency.clone()),
            ("metadata[user_id]", metadata.user_id.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_owned()),
        ];

        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let intent: IntentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }
}
