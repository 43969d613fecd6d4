//! Administrator handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cosmic_blueprints_core::{OrderId, OrderStatus, ReportId};

use crate::error::Result;
use crate::extract::{JsonBody, PathParam};
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::services::orders::OrderService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub report_id: ReportId,
}

#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub message: &'static str,
    pub order: Order,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Issue a report to the calling administrator without payment.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn generate_report(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(body): JsonBody<GenerateReportRequest>,
) -> Result<impl IntoResponse> {
    let order = state
        .checkout()
        .generate_free_report(&admin, body.report_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateReportResponse {
            message: "Report generated successfully",
            order,
        }),
    ))
}

/// Record the outcome of a payment confirmed outside the storefront.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<OrderId>,
    JsonBody(body): JsonBody<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.repo())
        .update_status(id, body.status)
        .await?;
    Ok(Json(order))
}
