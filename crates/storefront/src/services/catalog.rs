//! Catalog and learning content.
//!
//! Reads are public. Writes are admin-only, which the HTTP layer enforces
//! before calling in here.

use thiserror::Error;
use tracing::instrument;

use cosmic_blueprints_core::{ContentId, Price, ReportId};

use crate::db::{Repository, RepositoryError};
use crate::models::{EducationalContent, NewReport, Report, Testimonial};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("report {0} not found")]
    ReportNotFound(ReportId),

    #[error("content {0} not found")]
    ContentNotFound(ContentId),

    /// A new report failed field validation.
    #[error("{0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog service.
pub struct CatalogService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// All reports, or only those in `category` (exact match).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_reports(&self, category: Option<&str>) -> Result<Vec<Report>, CatalogError> {
        let reports = match category {
            Some(category) => self.repo.list_reports_by_category(category).await?,
            None => self.repo.list_reports().await?,
        };
        Ok(reports)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ReportNotFound` if the report does not exist.
    pub async fn get_report(&self, id: ReportId) -> Result<Report, CatalogError> {
        self.repo
            .get_report(id)
            .await?
            .ok_or(CatalogError::ReportNotFound(id))
    }

    /// Add a report to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` naming the first bad field.
    #[instrument(skip(self, report), fields(title = %report.title))]
    pub async fn create_report(&self, report: NewReport) -> Result<Report, CatalogError> {
        report.validate().map_err(CatalogError::Invalid)?;

        let report = self.repo.create_report(report).await?;
        tracing::info!(report_id = %report.id, "Report created");
        Ok(report)
    }

    /// Change a report's price. Existing orders keep the price they were
    /// bought at.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReportNotFound` if the report does not exist.
    #[instrument(skip(self))]
    pub async fn update_price(&self, id: ReportId, price: Price) -> Result<Report, CatalogError> {
        let report = self
            .repo
            .update_report_price(id, price)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ReportNotFound(id),
                other => CatalogError::Repository(other),
            })?;

        tracing::info!(report_id = %report.id, price = %report.price, "Report price updated");
        Ok(report)
    }

    /// Remove a report from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReportNotFound` if the report does not exist.
    #[instrument(skip(self))]
    pub async fn delete_report(&self, id: ReportId) -> Result<(), CatalogError> {
        if !self.repo.delete_report(id).await? {
            return Err(CatalogError::ReportNotFound(id));
        }
        tracing::info!(report_id = %id, "Report deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_content(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<EducationalContent>, CatalogError> {
        let content = match category {
            Some(category) => self.repo.list_content_by_category(category).await?,
            None => self.repo.list_content().await?,
        };
        Ok(content)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ContentNotFound` if the article does not exist.
    pub async fn get_content(&self, id: ContentId) -> Result<EducationalContent, CatalogError> {
        self.repo
            .get_content(id)
            .await?
            .ok_or(CatalogError::ContentNotFound(id))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_testimonials(&self) -> Result<Vec<Testimonial>, CatalogError> {
        Ok(self.repo.list_testimonials().await?)
    }
}
