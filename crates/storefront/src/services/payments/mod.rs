//! Payment provider integration.
//!
//! The storefront never moves money itself. It asks a provider to reserve
//! an amount and hands the resulting client secret to the browser, which
//! confirms the payment directly with the provider.

mod error;
mod stripe;

pub use error::PaymentError;
pub use stripe::StripeClient;

use async_trait::async_trait;
use serde::Serialize;

use cosmic_blueprints_core::UserId;

/// A reserved payment, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Provider reference, recorded on the order at checkout.
    #[serde(rename = "paymentIntentId")]
    pub id: String,
    /// Secret the browser uses to confirm the payment.
    pub client_secret: String,
}

/// Context attached to a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentMetadata {
    pub user_id: UserId,
}

/// External payment collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Reserve `amount_minor` (integral cents) and return a client secret.
    async fn create_intent(
        &self,
        amount_minor: i64,
        metadata: PaymentMetadata,
    ) -> Result<PaymentIntent, PaymentError>;
}

/// Provider used when no credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPayments;

#[async_trait]
impl PaymentProvider for DisabledPayments {
    async fn create_intent(
        &self,
        _amount_minor: i64,
        _metadata: PaymentMetadata,
    ) -> Result<PaymentIntent, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}
