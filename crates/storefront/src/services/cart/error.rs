//! Cart error types.

use thiserror::Error;

use cosmic_blueprints_core::{CartItemId, PriceError, ReportId};

use crate::db::RepositoryError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The report being added does not exist.
    #[error("report {0} not found")]
    ReportNotFound(ReportId),

    /// The cart line does not exist or belongs to someone else.
    #[error("cart item {0} not found")]
    ItemNotFound(CartItemId),

    /// The cart total is not a storable price.
    #[error("cart total: {0}")]
    Total(#[from] PriceError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
