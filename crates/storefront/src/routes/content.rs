//! Educational content and testimonials. Public, read-only.

use axum::{
    Json,
    extract::State,
};

use cosmic_blueprints_core::ContentId;

use crate::error::Result;
use crate::extract::PathParam;
use crate::models::{EducationalContent, Testimonial};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<EducationalContent>>> {
    Ok(Json(CatalogService::new(state.repo()).list_content(None).await?))
}

pub async fn show(
    State(state): State<AppState>,
    PathParam(id): PathParam<ContentId>,
) -> Result<Json<EducationalContent>> {
    Ok(Json(CatalogService::new(state.repo()).get_content(id).await?))
}

pub async fn by_category(
    State(state): State<AppState>,
    PathParam(category): PathParam<String>,
) -> Result<Json<Vec<EducationalContent>>> {
    let content = CatalogService::new(state.repo())
        .list_content(Some(&category))
        .await?;
    Ok(Json(content))
}

pub async fn testimonials(State(state): State<AppState>) -> Result<Json<Vec<Testimonial>>> {
    Ok(Json(
        CatalogService::new(state.repo()).list_testimonials().await?,
    ))
}
