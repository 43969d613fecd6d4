//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (pings the repository)
//!
//! # Users
//! POST   /users/register                  - Create account, start session
//! POST   /users/login                     - Verify credentials, start session
//! POST   /users/logout                    - End session
//! GET    /users/me                        - Current user (auth)
//!
//! # Reports
//! GET    /reports[?category=X]            - Catalog listing
//! POST   /reports                         - Create report (admin)
//! GET    /reports/{id}                    - Report detail
//! PATCH  /reports/{id}                    - Change price (admin)
//! DELETE /reports/{id}                    - Remove report (admin)
//!
//! # Cart (auth)
//! GET    /cart                            - Lines, total, count
//! POST   /cart                            - Add a report
//! DELETE /cart                            - Clear
//! DELETE /cart/{id}                       - Remove one line
//!
//! # Orders and checkout (auth)
//! GET    /orders                          - Order history
//! GET    /orders/{id}                     - One order
//! POST   /payment-intent                  - Reserve a payment
//! POST   /checkout/complete               - Turn the cart into an order
//!
//! # Admin
//! POST   /admin/generate-report           - Free report order
//! PATCH  /admin/orders/{id}/status        - Record payment outcome
//!
//! # Content
//! GET    /educational-content             - Articles
//! GET    /educational-content/{id}        - One article
//! GET    /educational-content/category/{category}
//! GET    /testimonials                    - Testimonials
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod content;
pub mod health;
pub mod reports;
pub mod users;

use axum::{
    Router,
    routing::{get, patch, post},
};
use serde::Serialize;

use crate::config::StorefrontConfig;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Plain confirmation body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

impl Message {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Create the user routes router.
///
/// Login and registration are rate limited per client IP when
/// `rate_limit_auth` is set.
pub fn user_routes(config: &StorefrontConfig) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login));

    let limiter = auth_rate_limiter(config.trust_proxy_headers).filter(|_| config.rate_limit_auth);
    let credentials = match limiter {
        Some(limiter) => credentials.layer(limiter),
        None => credentials,
    };

    Router::new()
        .merge(credentials)
        .route("/logout", post(users::logout))
        .route("/me", get(users::me))
}

/// Create the report routes router.
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(reports::index).post(reports::create))
        .route(
            "/{id}",
            get(reports::show)
                .patch(reports::update_price)
                .delete(reports::destroy),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/{id}", axum::routing::delete(cart::remove))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/generate-report", post(admin::generate_report))
        .route("/orders/{id}/status", patch(admin::update_order_status))
}

/// Create the educational content routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(content::index))
        .route("/{id}", get(content::show))
        .route("/category/{category}", get(content::by_category))
}

/// Create all routes for the storefront.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/users", user_routes(config))
        .nest("/reports", report_routes())
        .nest("/cart", cart_routes())
        .route("/orders", get(checkout::orders))
        .route("/orders/{id}", get(checkout::order))
        .route("/payment-intent", post(checkout::payment_intent))
        .route("/checkout/complete", post(checkout::complete))
        .nest("/admin", admin_routes())
        .nest("/educational-content", content_routes())
        .route("/testimonials", get(content::testimonials))
}
