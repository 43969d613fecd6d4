//! Integration tests for Cosmic Blueprints.
//!
//! Each test spins up the real storefront router on an ephemeral port,
//! backed by a seeded in-memory store and a fake payment provider, and
//! talks to it over HTTP with a cookie-holding client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cosmic-blueprints-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use cosmic_blueprints_storefront::config::StorefrontConfig;
use cosmic_blueprints_storefront::db::seed::{CatalogSeed, seed_catalog};
use cosmic_blueprints_storefront::db::{InMemoryRepository, Repository};
use cosmic_blueprints_storefront::services::auth::{AuthService, Registration};
use cosmic_blueprints_storefront::services::payments::{
    PaymentError, PaymentIntent, PaymentMetadata, PaymentProvider,
};
use cosmic_blueprints_storefront::{app, state::AppState};

/// Password used for every account the tests create.
pub const PASSWORD: &str = "correct horse battery";

/// Payment provider that approves everything and remembers what it saw.
#[derive(Debug, Default)]
pub struct FakePayments {
    calls: AtomicUsize,
    last_amount: AtomicI64,
}

impl FakePayments {
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_amount(&self) -> i64 {
        self.last_amount.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn create_intent(
        &self,
        amount_minor: i64,
        metadata: PaymentMetadata,
    ) -> Result<PaymentIntent, PaymentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.last_amount.store(amount_minor, Ordering::SeqCst);
        Ok(PaymentIntent {
            id: format!("pi_test_{n}"),
            client_secret: format!("pi_test_{n}_secret_{}", metadata.user_id),
        })
    }
}

/// A running storefront and handles to its backends.
pub struct TestContext {
    pub base_url: String,
    pub repo: Arc<InMemoryRepository>,
    pub payments: Arc<FakePayments>,
}

impl TestContext {
    /// Start a storefront with the bundled catalog and one administrator
    /// (`admin` / [`PASSWORD`]).
    pub async fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        seed_catalog(repo.as_ref(), CatalogSeed::bundled().expect("bundled catalog"))
            .await
            .expect("seed catalog");
        AuthService::new(repo.as_ref())
            .create_admin(Registration {
                username: "admin",
                email: "admin@cosmicblueprints.com",
                password: PASSWORD,
            })
            .await
            .expect("create admin");

        let payments = Arc::new(FakePayments::default());
        let config = StorefrontConfig {
            rate_limit_auth: false,
            ..StorefrontConfig::default()
        };
        let repo_dyn: Arc<dyn Repository> = repo.clone();
        let payments_dyn: Arc<dyn PaymentProvider> = payments.clone();
        let state = AppState::new(config, repo_dyn, payments_dyn);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("serve storefront");
        });

        Self {
            base_url: format!("http://{addr}"),
            repo,
            payments,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A fresh browser: its own cookie jar, no session.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Register `username` and return a client logged in as them.
    pub async fn customer(&self, username: &str) -> Client {
        let client = Self::client();
        let resp = client
            .post(self.url("/users/register"))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("register");
        assert_eq!(resp.status(), 201, "registering {username}");
        client
    }

    /// A client logged in as the administrator.
    pub async fn admin(&self) -> Client {
        let client = Self::client();
        let resp = client
            .post(self.url("/users/login"))
            .json(&json!({ "username": "admin", "password": PASSWORD }))
            .send()
            .await
            .expect("admin login");
        assert_eq!(resp.status(), 200, "admin login");
        client
    }

    /// Add a report to the client's cart and return the response body.
    pub async fn add_to_cart(&self, client: &Client, report_id: i32) -> Value {
        let resp = client
            .post(self.url("/cart"))
            .json(&json!({ "reportId": report_id }))
            .send()
            .await
            .expect("add to cart");
        assert!(resp.status().is_success(), "add report {report_id}");
        resp.json().await.expect("cart line json")
    }

    /// GET `path` and return the status and JSON body (`Null` when empty).
    pub async fn get_json(&self, client: &Client, path: &str) -> (u16, Value) {
        let resp = client.get(self.url(path)).send().await.expect("GET");
        let status = resp.status().as_u16();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}
