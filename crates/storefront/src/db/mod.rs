//! Data access for the storefront.
//!
//! Services never talk to a database directly. They receive a
//! [`Repository`] trait object, which is backed either by
//! [`InMemoryRepository`] (development and tests) or by [`PgRepository`]
//! (production).
//!
//! # Tables
//!
//! - `users` - accounts, unique on `lower(username)` and `lower(email)`
//! - `reports` - the catalog
//! - `cart_items` - unique on `(user_id, report_id)`
//! - `orders` / `order_items` - purchases with frozen prices
//! - `educational_content`, `testimonials` - reference data
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p cosmic-blueprints-cli -- migrate
//! ```

mod memory;
mod postgres;
pub mod seed;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cosmic_blueprints_core::{
    CartItemId, ContentId, Email, OrderId, OrderStatus, Price, ReportId, UserId, Username,
};

use crate::models::{
    CartItem, EducationalContent, NewEducationalContent, NewOrder, NewOrderItem, NewReport,
    NewTestimonial, NewUser, Order, OrderItem, Report, Testimonial, User,
};

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

/// Conflict message for a username that is already registered.
pub const USERNAME_TAKEN: &str = "username already exists";
/// Conflict message for an email that is already registered.
pub const EMAIL_TAKEN: &str = "email already exists";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage for every storefront entity.
///
/// Ids are assigned by the store, increase monotonically and are never
/// reused. The repository does not filter by owner; callers that accept an
/// id for a private row must check ownership themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Cheap liveness check of the backing store.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // Users

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Case-insensitive lookup.
    async fn get_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError>;

    /// Case-insensitive lookup.
    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// The user and their password hash, for login.
    async fn get_password_hash(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Fails with `Conflict(USERNAME_TAKEN)` or `Conflict(EMAIL_TAKEN)`.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    // Reports

    async fn get_report(&self, id: ReportId) -> Result<Option<Report>, RepositoryError>;

    async fn list_reports(&self) -> Result<Vec<Report>, RepositoryError>;

    async fn list_reports_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Report>, RepositoryError>;

    async fn create_report(&self, report: NewReport) -> Result<Report, RepositoryError>;

    /// Fails with `NotFound` when the report does not exist.
    async fn update_report_price(
        &self,
        id: ReportId,
        price: Price,
    ) -> Result<Report, RepositoryError>;

    /// Returns whether a report was deleted. Cart lines pointing at it are
    /// kept so checkout can report them as missing.
    async fn delete_report(&self, id: ReportId) -> Result<bool, RepositoryError>;

    // Cart

    async fn list_cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError>;

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError>;

    /// Insert a cart row unless one already exists for `(user_id, report_id)`.
    ///
    /// Returns the row and whether it was newly created.
    async fn add_cart_item(
        &self,
        user_id: UserId,
        report_id: ReportId,
    ) -> Result<(CartItem, bool), RepositoryError>;

    /// Returns whether a row was removed.
    async fn remove_cart_item(&self, id: CartItemId) -> Result<bool, RepositoryError>;

    /// Returns the number of rows removed.
    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError>;

    // Orders

    /// Write an order with its items and remove the cart lines it consumed,
    /// all or nothing.
    ///
    /// Only lines in `consumed` that belong to `order.user_id` are removed.
    async fn place_order(
        &self,
        order: NewOrder,
        items: &[NewOrderItem],
        consumed: &[CartItemId],
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Newest first.
    async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Fails with `NotFound` when the order does not exist.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError>;

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError>;

    // Educational content and testimonials

    async fn list_content(&self) -> Result<Vec<EducationalContent>, RepositoryError>;

    async fn get_content(
        &self,
        id: ContentId,
    ) -> Result<Option<EducationalContent>, RepositoryError>;

    async fn list_content_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<EducationalContent>, RepositoryError>;

    async fn create_content(
        &self,
        content: NewEducationalContent,
    ) -> Result<EducationalContent, RepositoryError>;

    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError>;

    async fn create_testimonial(
        &self,
        testimonial: NewTestimonial,
    ) -> Result<Testimonial, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
