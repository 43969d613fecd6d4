//! Report catalog handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use cosmic_blueprints_core::{Price, ReportId};

use crate::error::Result;
use crate::extract::{JsonBody, PathParam};
use crate::middleware::RequireAdmin;
use crate::models::{NewReport, Report};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Query parameters for the report listing.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub category: Option<String>,
}

/// Price change request body.
#[derive(Debug, Deserialize)]
pub struct PriceUpdate {
    pub price: Price,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<Report>>> {
    let reports = CatalogService::new(state.repo())
        .list_reports(query.category.as_deref())
        .await?;
    Ok(Json(reports))
}

pub async fn show(
    State(state): State<AppState>,
    PathParam(id): PathParam<ReportId>,
) -> Result<Json<Report>> {
    Ok(Json(CatalogService::new(state.repo()).get_report(id).await?))
}

#[instrument(skip(state, admin, report), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(report): JsonBody<NewReport>,
) -> Result<impl IntoResponse> {
    let report = CatalogService::new(state.repo())
        .create_report(report)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_price(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<ReportId>,
    JsonBody(body): JsonBody<PriceUpdate>,
) -> Result<Json<Report>> {
    let report = CatalogService::new(state.repo())
        .update_price(id, body.price)
        .await?;
    Ok(Json(report))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<ReportId>,
) -> Result<StatusCode> {
    CatalogService::new(state.repo()).delete_report(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
