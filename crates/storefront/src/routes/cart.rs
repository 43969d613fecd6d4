//! Cart route handlers.
//!
//! Every handler requires a session; the user id always comes from the
//! session, never from the request body.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use cosmic_blueprints_core::{CartItemId, ReportId};

use super::Message;
use crate::error::{Result, add_breadcrumb};
use crate::extract::{JsonBody, PathParam};
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::services::cart::{CartError, CartService};
use crate::state::AppState;

/// Add to cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub report_id: ReportId,
}

/// The caller's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.repo()).list_items(user.id).await?;
    let view = CartView::try_from(lines).map_err(CartError::from)?;
    Ok(Json(view))
}

/// Add a report. Adding one that is already in the cart returns the
/// existing line with 200 instead of 201.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<AddToCartRequest>,
) -> Result<impl IntoResponse> {
    let (line, created) = CartService::new(state.repo())
        .add_item(user.id, body.report_id)
        .await?;

    let report_id = body.report_id.to_string();
    let data: &[(&str, &str)] = &[("report_id", report_id.as_str())];
    add_breadcrumb("cart", "Added report", Some(data));

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(line)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    PathParam(id): PathParam<CartItemId>,
) -> Result<Json<Message>> {
    CartService::new(state.repo())
        .remove_item(user.id, id)
        .await?;
    Ok(Json(Message::new("Item removed from cart")))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Message>> {
    let removed = CartService::new(state.repo()).clear(user.id).await?;
    tracing::debug!(removed, "Cart cleared");
    Ok(Json(Message::new("Cart cleared")))
}
