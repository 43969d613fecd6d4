//! Cart service.
//!
//! A cart is the set of reports a user means to buy. Each report appears at
//! most once per user; adding it again returns the existing line.

mod error;

pub use error::CartError;

use tracing::instrument;

use cosmic_blueprints_core::{CartItemId, ReportId, UserId};

use crate::db::Repository;
use crate::models::{CartItem, CartLine};

/// Cart service.
pub struct CartService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// Add a report to the user's cart.
    ///
    /// Returns the line joined with its report, and whether it was created.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ReportNotFound` if the report does not exist.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        report_id: ReportId,
    ) -> Result<(CartLine, bool), CartError> {
        let report = self
            .repo
            .get_report(report_id)
            .await?
            .ok_or(CartError::ReportNotFound(report_id))?;

        let (item, created) = self.repo.add_cart_item(user_id, report_id).await?;
        if !created {
            tracing::debug!(cart_item_id = %item.id, "Report already in cart");
        }

        Ok((CartLine::new(item, report), created))
    }

    /// Remove one line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line does not exist or is
    /// owned by another user.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<(), CartError> {
        self.owned_item(user_id, item_id).await?;

        if !self.repo.remove_cart_item(item_id).await? {
            return Err(CartError::ItemNotFound(item_id));
        }
        Ok(())
    }

    /// Remove every line from the user's cart. Succeeds on an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<u64, CartError> {
        Ok(self.repo.clear_cart(user_id).await?)
    }

    /// The user's cart lines joined with their reports.
    ///
    /// Lines whose report has since been deleted are left out.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_items(&self, user_id: UserId) -> Result<Vec<CartLine>, CartError> {
        let items = self.repo.list_cart_items(user_id).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            match self.repo.get_report(item.report_id).await? {
                Some(report) => lines.push(CartLine::new(item, report)),
                None => {
                    tracing::warn!(
                        cart_item_id = %item.id,
                        report_id = %item.report_id,
                        "Cart line references a missing report"
                    );
                }
            }
        }
        Ok(lines)
    }

    async fn owned_item(&self, user_id: UserId, item_id: CartItemId) -> Result<CartItem, CartError> {
        match self.repo.get_cart_item(item_id).await? {
            Some(item) if item.user_id == user_id => Ok(item),
            _ => Err(CartError::ItemNotFound(item_id)),
        }
    }
}
