//! Order types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cosmic_blueprints_core::{OrderId, OrderItemId, OrderStatus, Price, ReportId, UserId};

/// Payment reference recorded on orders an administrator generated for free.
pub const ADMIN_GENERATED_REFERENCE: &str = "admin-generated";

/// A purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Price,
    /// Opaque reference handed back by the payment provider.
    #[serde(rename = "paymentIntentId")]
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create an [`Order`]. New orders are always `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total: Price,
    pub payment_reference: Option<String>,
}

/// One line of an order, with the price frozen at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub report_id: ReportId,
    pub price: Price,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub report_id: ReportId,
    pub price: Price,
}

/// An order together with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
