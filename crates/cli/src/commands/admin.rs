//! Administrator account management.
//!
//! # Usage
//!
//! ```bash
//! CB_ADMIN_PASSWORD='...' cb-cli admin create -u admin -e admin@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//! - `CB_ADMIN_PASSWORD` - Password for the new account (kept off the
//!   command line so it does not end up in shell history)

use secrecy::{ExposeSecret, SecretString};

use cosmic_blueprints_core::UserId;
use cosmic_blueprints_storefront::db::PgRepository;
use cosmic_blueprints_storefront::services::auth::{AuthService, Registration};

use super::{CommandError, connect};

/// Create a new administrator.
///
/// # Errors
///
/// Returns an error if the password is not set, the input is invalid, the
/// username or email is taken, or the database is unreachable.
pub async fn create(username: &str, email: &str) -> Result<UserId, CommandError> {
    dotenvy::dotenv().ok();

    let password = std::env::var("CB_ADMIN_PASSWORD")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("CB_ADMIN_PASSWORD"))?;

    let repo = PgRepository::new(connect().await?);

    tracing::info!("Creating administrator: {username} ({email})");
    let user = AuthService::new(&repo)
        .create_admin(Registration {
            username,
            email,
            password: password.expose_secret(),
        })
        .await?;

    tracing::info!(
        "Administrator created successfully! ID: {}, Username: {}",
        user.id,
        user.username
    );
    Ok(user.id)
}
