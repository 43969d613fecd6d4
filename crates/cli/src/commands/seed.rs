//! Seed the catalog.
//!
//! Reads a YAML document with `reports`, `educationalContent` and
//! `testimonials` and inserts it into the storefront database. Nothing is
//! inserted if the database already has reports, so the command is safe to
//! run on every deploy.

use std::path::Path;

use tracing::info;

use cosmic_blueprints_storefront::db::PgRepository;
use cosmic_blueprints_storefront::db::seed::{CatalogSeed, seed_catalog};

use super::{CommandError, connect};

/// Seed from `file`, or from the catalog bundled with the storefront.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if an insert
/// fails.
pub async fn run(file: Option<&Path>) -> Result<(), CommandError> {
    // Read and validate YAML before connecting to database
    let seed = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading seed from file");
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CommandError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
            CatalogSeed::from_yaml(&content)?
        }
        None => CatalogSeed::bundled()?,
    };

    info!(
        reports = seed.reports.len(),
        educational_content = seed.educational_content.len(),
        testimonials = seed.testimonials.len(),
        "Parsed seed"
    );

    let repo = PgRepository::new(connect().await?);
    let summary = seed_catalog(&repo, seed).await?;

    if summary.skipped {
        info!("Reports already present, nothing inserted");
    } else {
        info!("Seeding complete!");
        info!("  Reports: {}", summary.reports);
        info!("  Educational content: {}", summary.educational_content);
        info!("  Testimonials: {}", summary.testimonials);
    }

    Ok(())
}
