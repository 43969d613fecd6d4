//! Cart types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cosmic_blueprints_core::{CartItemId, Price, PriceError, ReportId, UserId};

use super::Report;

/// A stored cart row: "this user intends to buy this report".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub report_id: ReportId,
    pub created_at: DateTime<Utc>,
}

/// A cart row joined with the report it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub report_id: ReportId,
    pub report: Report,
    pub created_at: DateTime<Utc>,
}

impl CartLine {
    #[must_use]
    pub fn new(item: CartItem, report: Report) -> Self {
        Self {
            id: item.id,
            report_id: item.report_id,
            report,
            created_at: item.created_at,
        }
    }
}

/// Sum of the current report prices of `lines`.
///
/// # Errors
///
/// Returns `PriceError::Overflow` if the sum is not a storable price.
pub fn total_price(lines: &[CartLine]) -> Result<Price, PriceError> {
    Price::total(lines.iter().map(|line| line.report.price))
}

/// The cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: Price,
    pub item_count: usize,
}

impl TryFrom<Vec<CartLine>> for CartView {
    type Error = PriceError;

    fn try_from(items: Vec<CartLine>) -> Result<Self, Self::Error> {
        let total = total_price(&items)?;
        Ok(Self {
            item_count: items.len(),
            items,
            total,
        })
    }
}
