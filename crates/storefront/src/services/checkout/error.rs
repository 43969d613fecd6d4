//! Checkout error types.

use thiserror::Error;

use cosmic_blueprints_core::{OrderId, PriceError, ReportId};

use crate::db::RepositoryError;
use crate::services::payments::PaymentError;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line points at a report that no longer exists.
    #[error("report {0} in cart is no longer available")]
    ReportMissing(ReportId),

    /// The requested report does not exist.
    #[error("report {0} not found")]
    ReportNotFound(ReportId),

    /// The caller is not an administrator.
    #[error("administrator access required")]
    Forbidden,

    /// The payment provider failed or refused.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The cart total is not a storable price.
    #[error("cart total: {0}")]
    Total(#[from] PriceError),

    /// The store reported success but wrote a different number of items
    /// than requested. Needs manual reconciliation.
    #[error("order {order_id} is inconsistent: wrote {written} of {expected} items")]
    Inconsistent {
        order_id: OrderId,
        expected: usize,
        written: usize,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
