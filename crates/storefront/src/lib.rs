//! Cosmic Blueprints Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused. [`build_state`] wires the backends
//! together from configuration and [`app`] builds the full router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::{Router, body::Body, http::Request};
use secrecy::ExposeSecret;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use config::StorefrontConfig;
use db::seed::{CatalogSeed, SeedError, seed_catalog};
use db::{InMemoryRepository, PgRepository, Repository};
use services::auth::{AuthError, AuthService, Registration};
use services::payments::{DisabledPayments, PaymentError, PaymentProvider, StripeClient};
use state::AppState;

/// Errors that can occur while assembling the application.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("seeding failed: {0}")]
    Seed(#[from] SeedError),

    #[error("bootstrap admin: {0}")]
    Admin(#[from] AuthError),

    #[error("payment provider: {0}")]
    Payments(#[from] PaymentError),
}

/// Build application state from configuration.
///
/// With a database URL the storefront uses `PostgreSQL` (migrations and
/// seeding are the CLI's job). Without one it runs on an in-memory store
/// seeded with the bundled catalog and, if configured, a bootstrap admin.
///
/// # Errors
///
/// Returns `StartupError` if a backend cannot be initialised.
pub async fn build_state(config: StorefrontConfig) -> Result<AppState, StartupError> {
    let repo: Arc<dyn Repository> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            tracing::info!("Database pool created");
            Arc::new(PgRepository::new(pool))
        }
        None => {
            let repo = InMemoryRepository::new();
            seed_catalog(&repo, CatalogSeed::bundled()?).await?;
            if let Some(admin) = &config.bootstrap_admin {
                let user = AuthService::new(&repo)
                    .create_admin(Registration {
                        username: &admin.username,
                        email: &admin.email,
                        password: admin.password.expose_secret(),
                    })
                    .await?;
                tracing::info!(user_id = %user.id, "Bootstrap admin created");
            }
            tracing::warn!("No database configured, using in-memory store");
            Arc::new(repo)
        }
    };

    let payments: Arc<dyn PaymentProvider> = if config.payments.secret_key.is_some() {
        Arc::new(StripeClient::new(&config.payments)?)
    } else {
        tracing::warn!("STRIPE_SECRET_KEY not set, payment intents are disabled");
        Arc::new(DisabledPayments)
    };

    Ok(AppState::new(config, repo, payments))
}

/// Build the full router with every middleware layer.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    routes::routes(state.config())
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(trace_layer)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let config = StorefrontConfig {
            rate_limit_auth: false,
            ..StorefrontConfig::default()
        };
        app(build_state(config).await.unwrap())
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_in_memory_state_is_seeded() {
        let (status, reports) = get(test_app().await, "/reports").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reports.as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_readiness() {
        let (status, _) = get(test_app().await, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_requires_session() {
        let (status, body) = get(test_app().await, "/cart").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_bootstrap_admin() {
        let config = StorefrontConfig {
            bootstrap_admin: Some(config::BootstrapAdmin {
                username: "admin".to_owned(),
                email: "admin@cosmicblueprints.com".to_owned(),
                password: "stellar-admin-pass".into(),
            }),
            ..StorefrontConfig::default()
        };
        let state = build_state(config).await.unwrap();

        let admin = state
            .repo()
            .get_user_by_username(&cosmic_blueprints_core::Username::parse("admin").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin);
    }
}
