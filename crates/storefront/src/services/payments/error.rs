//! Payment provider error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider refused the request.
    #[error("payment provider rejected the request: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Amount must be positive and fit in minor units.
    #[error("invalid payment amount: {0}")]
    InvalidAmount(String),

    /// No provider credentials are configured.
    #[error("payments are not configured")]
    NotConfigured,

    /// The provider did not answer in time.
    #[error("payment provider timed out after {0:?}")]
    Timeout(Duration),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}
