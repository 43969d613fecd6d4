//! Checkout and order history handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use cosmic_blueprints_core::OrderId;

use crate::error::{Result, add_breadcrumb};
use crate::extract::{JsonBody, PathParam};
use crate::middleware::RequireAuth;
use crate::models::OrderDetails;
use crate::services::orders::OrderService;
use crate::services::payments::PaymentIntent;
use crate::state::AppState;

/// Payment intent request body. Without an amount the cart total is used.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentIntentRequest {
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Checkout completion request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCheckoutRequest {
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn payment_intent(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<PaymentIntentRequest>,
) -> Result<Json<PaymentIntent>> {
    let intent = state
        .checkout()
        .begin_payment_intent(user.id, body.amount)
        .await?;
    Ok(Json(intent))
}

/// Convert the caller's cart into a pending order.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn complete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<CompleteCheckoutRequest>,
) -> Result<impl IntoResponse> {
    let order = state
        .checkout()
        .complete_checkout(user.id, body.payment_intent_id)
        .await?;

    let order_id = order.id.to_string();
    let data: &[(&str, &str)] = &[("order_id", order_id.as_str())];
    add_breadcrumb("checkout", "Checkout completed", Some(data));

    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderDetails>>> {
    let orders = OrderService::new(state.repo())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    PathParam(id): PathParam<OrderId>,
) -> Result<Json<OrderDetails>> {
    let order = OrderService::new(state.repo())
        .get_for_user(user.id, id)
        .await?;
    Ok(Json(order))
}
