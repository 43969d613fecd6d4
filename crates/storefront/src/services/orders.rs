//! Order history.

use thiserror::Error;
use tracing::instrument;

use cosmic_blueprints_core::{OrderId, OrderStatus, UserId};

use crate::db::{Repository, RepositoryError};
use crate::models::{Order, OrderDetails};

#[derive(Debug, Error)]
pub enum OrderError {
    /// The order does not exist or belongs to someone else.
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

pub struct OrderService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// Every order the user placed, newest first, with items.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderDetails>, OrderError> {
        let orders = self.repo.list_orders_by_user(user_id).await?;

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.repo.list_order_items(order.id).await?;
            details.push(OrderDetails { order, items });
        }
        Ok(details)
    }

    /// One of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown id and for an order
    /// owned by another user.
    #[instrument(skip(self))]
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetails, OrderError> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(OrderError::NotFound(order_id))?;

        let items = self.repo.list_order_items(order.id).await?;
        Ok(OrderDetails { order, items })
    }

    /// Record a status reported by the payment provider or an operator.
    ///
    /// Any transition is accepted; the storefront does not drive the
    /// lifecycle itself.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = self
            .repo
            .update_order_status(order_id, status)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound(order_id),
                other => OrderError::Repository(other),
            })?;

        tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;
    use crate::models::{NewOrder, NewOrderItem};
    use cosmic_blueprints_core::{Price, ReportId};

    async fn place(repo: &InMemoryRepository, user_id: UserId, cents: u32) -> Order {
        let (order, _) = repo
            .place_order(
                NewOrder {
                    user_id,
                    total: Price::from_cents(cents),
                    payment_reference: Some("pi_1".to_owned()),
                },
                &[NewOrderItem {
                    report_id: ReportId::new(1),
                    price: Price::from_cents(cents),
                }],
                &[],
            )
            .await
            .unwrap();
        order
    }

    #[tokio::test]
    async fn test_list_newest_first_with_items() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let first = place(&repo, user, 3999).await;
        let second = place(&repo, user, 4999).await;
        place(&repo, UserId::new(2), 2999).await;

        let orders = OrderService::new(&repo).list_for_user(user).await.unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order.id, second.id);
        assert_eq!(orders[1].order.id, first.id);
        assert_eq!(orders[0].items.len(), 1);
    }

    #[tokio::test]
    async fn test_other_users_order_is_not_found() {
        let repo = InMemoryRepository::new();
        let order = place(&repo, UserId::new(1), 3999).await;
        let service = OrderService::new(&repo);

        assert!(service.get_for_user(UserId::new(1), order.id).await.is_ok());
        let err = service
            .get_for_user(UserId::new(2), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_status() {
        let repo = InMemoryRepository::new();
        let order = place(&repo, UserId::new(1), 3999).await;
        let service = OrderService::new(&repo);

        let updated = service
            .update_status(order.id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Completed);

        let err = service
            .update_status(OrderId::new(404), OrderStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }
}
