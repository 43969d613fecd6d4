//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cb-cli migrate
//! ```
//!
//! # Migration Files
//!
//! Storefront migrations: `crates/storefront/migrations/`

use super::{CommandError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
