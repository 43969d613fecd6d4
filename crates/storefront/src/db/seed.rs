//! Catalog seed data.
//!
//! The seed is a YAML document with three lists: `reports`,
//! `educationalContent` and `testimonials`. The bundled copy lives in
//! `crates/storefront/seed/catalog.yaml`.

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::{Repository, RepositoryError};
use crate::models::{NewEducationalContent, NewReport, NewTestimonial};

/// The catalog bundled with the binary.
pub const BUNDLED_CATALOG: &str = include_str!("../../seed/catalog.yaml");

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid report '{title}': {reason}")]
    InvalidReport { title: String, reason: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A parsed seed document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSeed {
    #[serde(default)]
    pub reports: Vec<NewReport>,
    #[serde(default)]
    pub educational_content: Vec<NewEducationalContent>,
    #[serde(default)]
    pub testimonials: Vec<NewTestimonial>,
}

impl CatalogSeed {
    /// Parse and validate a seed document.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` for malformed YAML and
    /// `SeedError::InvalidReport` for a report that fails validation.
    pub fn from_yaml(yaml: &str) -> Result<Self, SeedError> {
        let seed: Self = serde_yaml::from_str(yaml)?;
        for report in &seed.reports {
            report
                .validate()
                .map_err(|reason| SeedError::InvalidReport {
                    title: report.title.clone(),
                    reason,
                })?;
        }
        Ok(seed)
    }

    /// The catalog bundled with the binary.
    ///
    /// # Errors
    ///
    /// Fails only if the bundled file is broken.
    pub fn bundled() -> Result<Self, SeedError> {
        Self::from_yaml(BUNDLED_CATALOG)
    }
}

/// What a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub reports: usize,
    pub educational_content: usize,
    pub testimonials: usize,
    /// The store already had reports, so nothing was inserted.
    pub skipped: bool,
}

/// Insert `seed` into `repo` unless the catalog is already populated.
///
/// # Errors
///
/// Returns `SeedError::Repository` if any insert fails.
pub async fn seed_catalog(
    repo: &dyn Repository,
    seed: CatalogSeed,
) -> Result<SeedSummary, SeedError> {
    if !repo.list_reports().await?.is_empty() {
        info!("Catalog already populated, skipping seed");
        return Ok(SeedSummary {
            skipped: true,
            ..SeedSummary::default()
        });
    }

    let mut summary = SeedSummary::default();
    for report in seed.reports {
        repo.create_report(report).await?;
        summary.reports += 1;
    }
    for content in seed.educational_content {
        repo.create_content(content).await?;
        summary.educational_content += 1;
    }
    for testimonial in seed.testimonials {
        repo.create_testimonial(testimonial).await?;
        summary.testimonials += 1;
    }

    info!(
        reports = summary.reports,
        educational_content = summary.educational_content,
        testimonials = summary.testimonials,
        "Catalog seeded"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;
    use cosmic_blueprints_core::{Price, ReportId};

    #[test]
    fn test_bundled_catalog_parses() {
        let seed = CatalogSeed::bundled().unwrap();
        assert_eq!(seed.reports.len(), 12);
        assert_eq!(seed.educational_content.len(), 3);
        assert_eq!(seed.testimonials.len(), 3);

        let first = &seed.reports[0];
        assert_eq!(first.title, "Birth Chart Analysis");
        assert_eq!(first.price, Price::from_cents(3999));
        assert!(first.is_bestseller);
        assert!(seed.educational_content[0].content.starts_with("# Understanding"));
    }

    #[test]
    fn test_invalid_report_rejected() {
        let yaml = "reports:\n  - title: ''\n    description: d\n    price: 1\n    category: c\n";
        let err = CatalogSeed::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, SeedError::InvalidReport { .. }));
    }

    #[tokio::test]
    async fn test_seed_is_skipped_when_populated() {
        let repo = InMemoryRepository::new();

        let summary = seed_catalog(&repo, CatalogSeed::bundled().unwrap())
            .await
            .unwrap();
        assert_eq!(summary.reports, 12);
        assert!(!summary.skipped);

        let report = repo.get_report(ReportId::new(2)).await.unwrap().unwrap();
        assert_eq!(report.title, "Relationship Compatibility");
        assert_eq!(report.price, Price::from_cents(4999));

        let again = seed_catalog(&repo, CatalogSeed::bundled().unwrap())
            .await
            .unwrap();
        assert!(again.skipped);
        assert_eq!(repo.list_reports().await.unwrap().len(), 12);
    }
}
