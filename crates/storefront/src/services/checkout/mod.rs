//! Checkout: turning a cart into an order.
//!
//! A paid checkout runs in two requests. First the browser asks for a
//! payment intent and confirms it with the provider. Then it calls
//! [`CheckoutService::complete_checkout`], which writes the order and its
//! items with frozen prices and removes the purchased cart lines in one
//! atomic repository call.
//!
//! Administrators can also issue a report for free with
//! [`CheckoutService::generate_free_report`], which skips both the provider
//! and the cart.
//!
//! Checkouts for the same user are serialized, so two concurrent
//! completions cannot both consume one cart. A store that acknowledges an
//! order with fewer items than it was given yields
//! [`CheckoutError::Inconsistent`], logged for manual reconciliation.

mod error;
mod locks;

pub use error::CheckoutError;
pub use locks::CheckoutLocks;

use std::time::Duration;

use rust_decimal::Decimal;
use tracing::instrument;

use cosmic_blueprints_core::{CartItemId, OrderId, Price, ReportId, UserId};

use crate::db::Repository;
use crate::models::{ADMIN_GENERATED_REFERENCE, NewOrder, NewOrderItem, Order, User};
use crate::services::payments::{PaymentError, PaymentIntent, PaymentMetadata, PaymentProvider};

/// Checkout service.
pub struct CheckoutService<'a> {
    repo: &'a dyn Repository,
    payments: &'a dyn PaymentProvider,
    locks: &'a CheckoutLocks,
    payment_timeout: Duration,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        repo: &'a dyn Repository,
        payments: &'a dyn PaymentProvider,
        locks: &'a CheckoutLocks,
        payment_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            payments,
            locks,
            payment_timeout,
        }
    }

    /// Reserve a payment with the provider.
    ///
    /// `amount` is in standard units (dollars). When `None`, the current
    /// total of the user's cart is used. Does not touch orders or the cart.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` for an amount that is not
    /// positive or not a storable price, `PaymentError::Timeout` if the provider is too slow, and
    /// any error the provider reports.
    #[instrument(skip(self))]
    pub async fn begin_payment_intent(
        &self,
        user_id: UserId,
        amount: Option<Decimal>,
    ) -> Result<PaymentIntent, CheckoutError> {
        let amount = match amount {
            Some(amount) => Price::new(amount)
                .map_err(|e| PaymentError::InvalidAmount(format!("{amount}: {e}")))?,
            None => self.cart_total(user_id).await?,
        };

        let minor = amount
            .to_minor_units()
            .map_err(|e| PaymentError::InvalidAmount(format!("{amount}: {e}")))?;
        if minor <= 0 {
            return Err(PaymentError::InvalidAmount(format!("{amount}: must be positive")).into());
        }

        let metadata = PaymentMetadata { user_id };
        let intent = tokio::time::timeout(
            self.payment_timeout,
            self.payments.create_intent(minor, metadata),
        )
        .await
        .map_err(|_| PaymentError::Timeout(self.payment_timeout))??;

        tracing::info!(amount_minor = minor, payment_intent = %intent.id, "Payment intent created");
        Ok(intent)
    }

    /// Convert the user's cart into a pending order.
    ///
    /// The total is computed from current report prices, and every order
    /// item records the price it was bought at.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines,
    /// `CheckoutError::ReportMissing` if a line's report was deleted,
    /// `CheckoutError::Total` if the total is not a storable price, and
    /// `CheckoutError::Repository` if the order could not be placed. In
    /// every one of these cases nothing was written.
    #[instrument(skip(self, payment_reference))]
    pub async fn complete_checkout(
        &self,
        user_id: UserId,
        payment_reference: Option<String>,
    ) -> Result<Order, CheckoutError> {
        let _guard = self.locks.acquire(user_id).await;

        let cart = self.repo.list_cart_items(user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut items = Vec::with_capacity(cart.len());
        for line in &cart {
            let report = self
                .repo
                .get_report(line.report_id)
                .await?
                .ok_or(CheckoutError::ReportMissing(line.report_id))?;
            items.push(NewOrderItem {
                report_id: report.id,
                price: report.price,
            });
        }
        let total = Price::total(items.iter().map(|item| item.price))?;
        let consumed: Vec<_> = cart.iter().map(|line| line.id).collect();

        let order = self
            .place(
                NewOrder {
                    user_id,
                    total,
                    payment_reference,
                },
                &items,
                &consumed,
            )
            .await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total,
            items = items.len(),
            "Checkout completed"
        );
        Ok(order)
    }

    /// Issue a report to an administrator without payment.
    ///
    /// Creates a zero-total order with a single zero-priced item. The cart
    /// is neither read nor modified.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Forbidden` if `actor` is not an
    /// administrator and `CheckoutError::ReportNotFound` if the report does
    /// not exist.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn generate_free_report(
        &self,
        actor: &User,
        report_id: ReportId,
    ) -> Result<Order, CheckoutError> {
        if !actor.is_admin {
            return Err(CheckoutError::Forbidden);
        }

        let report = self
            .repo
            .get_report(report_id)
            .await?
            .ok_or(CheckoutError::ReportNotFound(report_id))?;

        let order = self
            .place(
                NewOrder {
                    user_id: actor.id,
                    total: Price::ZERO,
                    payment_reference: Some(ADMIN_GENERATED_REFERENCE.to_owned()),
                },
                &[NewOrderItem {
                    report_id: report.id,
                    price: Price::ZERO,
                }],
                &[],
            )
            .await?;

        tracing::info!(order_id = %order.id, report_id = %report.id, "Free report generated");
        Ok(order)
    }

    async fn place(
        &self,
        order: NewOrder,
        items: &[NewOrderItem],
        consumed: &[CartItemId],
    ) -> Result<Order, CheckoutError> {
        let (order, written) = self.repo.place_order(order, items, consumed).await?;
        if written.len() != items.len() {
            return Err(inconsistent(order.id, items.len(), written.len()));
        }
        Ok(order)
    }

    async fn cart_total(&self, user_id: UserId) -> Result<Price, CheckoutError> {
        let mut total = Price::ZERO;
        for line in self.repo.list_cart_items(user_id).await? {
            let report = self
                .repo
                .get_report(line.report_id)
                .await?
                .ok_or(CheckoutError::ReportMissing(line.report_id))?;
            total = total
                .checked_add(report.price)
                .map_err(|e| PaymentError::InvalidAmount(format!("cart total: {e}")))?;
        }
        Ok(total)
    }
}

fn inconsistent(order_id: OrderId, expected: usize, written: usize) -> CheckoutError {
    tracing::error!(
        order_id = %order_id,
        expected,
        written,
        "Order items missing after checkout; manual reconciliation required"
    );
    CheckoutError::Inconsistent {
        order_id,
        expected,
        written,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{InMemoryRepository, MockRepository, RepositoryError};
    use crate::models::{BirthDetails, CartItem, Gradient, NewReport, NewUser, OrderItem, Report};
    use crate::services::payments::MockPaymentProvider;
    use async_trait::async_trait;
    use chrono::Utc;
    use cosmic_blueprints_core::{Email, OrderStatus, PriceError, Username};

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Fixture {
        repo: InMemoryRepository,
        payments: MockPaymentProvider,
        locks: CheckoutLocks,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                repo: InMemoryRepository::new(),
                payments: MockPaymentProvider::new(),
                locks: CheckoutLocks::new(),
            }
        }

        fn service(&self) -> CheckoutService<'_> {
            CheckoutService::new(&self.repo, &self.payments, &self.locks, TIMEOUT)
        }

        async fn report(&self, title: &str, cents: u32) -> ReportId {
            self.repo
                .create_report(NewReport {
                    title: title.to_owned(),
                    description: "d".to_owned(),
                    price: Price::from_cents(cents),
                    category: "Personal".to_owned(),
                    preview_url: None,
                    icon_name: None,
                    rating: Decimal::from(5),
                    review_count: 0,
                    is_bestseller: false,
                    gradient: Gradient::default(),
                })
                .await
                .unwrap()
                .id
        }

        async fn user(&self, name: &str, is_admin: bool) -> User {
            self.repo
                .create_user(NewUser {
                    username: Username::parse(name).unwrap(),
                    email: Email::parse(&format!("{name}@example.com")).unwrap(),
                    password_hash: "hash".to_owned(),
                    is_admin,
                    birth: BirthDetails::default(),
                })
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_checkout_snapshots_prices_and_clears_cart() {
        let fx = Fixture::new();
        let user = fx.user("luna", false).await;
        let birth_chart = fx.report("Birth Chart Analysis", 3999).await;
        let compatibility = fx.report("Relationship Compatibility", 4999).await;
        fx.repo.add_cart_item(user.id, birth_chart).await.unwrap();
        fx.repo.add_cart_item(user.id, compatibility).await.unwrap();

        let order = fx
            .service()
            .complete_checkout(user.id, Some("pi_123".to_owned()))
            .await
            .unwrap();

        assert_eq!(order.total, Price::from_cents(8998));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_reference.as_deref(), Some("pi_123"));

        let items = fx.repo.list_order_items(order.id).await.unwrap();
        let mut prices: Vec<_> = items.iter().map(|i| i.price).collect();
        prices.sort();
        assert_eq!(prices, [Price::from_cents(3999), Price::from_cents(4999)]);
        assert!(fx.repo.list_cart_items(user.id).await.unwrap().is_empty());

        // Later catalog changes leave the order alone.
        fx.repo
            .update_report_price(birth_chart, Price::from_cents(100))
            .await
            .unwrap();
        let items = fx.repo.list_order_items(order.id).await.unwrap();
        let item_total = Price::total(items.iter().map(|i| i.price)).unwrap();
        assert_eq!(item_total, order.total);
    }

    #[tokio::test]
    async fn test_checkout_uses_price_at_checkout_time() {
        let fx = Fixture::new();
        let user = fx.user("luna", false).await;
        let report = fx.report("Solar Return", 3499).await;
        fx.repo.add_cart_item(user.id, report).await.unwrap();
        fx.repo
            .update_report_price(report, Price::from_cents(2999))
            .await
            .unwrap();

        let order = fx.service().complete_checkout(user.id, None).await.unwrap();
        assert_eq!(order.total, Price::from_cents(2999));
    }

    #[tokio::test]
    async fn test_empty_cart_creates_no_order() {
        let fx = Fixture::new();
        let user = fx.user("luna", false).await;

        let err = fx
            .service()
            .complete_checkout(user.id, Some("pi_1".to_owned()))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(fx.repo.list_orders_by_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_report_aborts_before_order() {
        let fx = Fixture::new();
        let user = fx.user("luna", false).await;
        let report = fx.report("Lunar Cycles", 2999).await;
        fx.repo.add_cart_item(user.id, report).await.unwrap();
        fx.repo.delete_report(report).await.unwrap();

        let err = fx
            .service()
            .complete_checkout(user.id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ReportMissing(id) if id == report));
        assert!(fx.repo.list_orders_by_user(user.id).await.unwrap().is_empty());
        assert_eq!(fx.repo.list_cart_items(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_consume_cart_once() {
        let fx = Fixture::new();
        let user = fx.user("luna", false).await;
        let report = fx.report("Transit Forecast", 5499).await;
        fx.repo.add_cart_item(user.id, report).await.unwrap();

        let service = fx.service();
        let (a, b) = tokio::join!(
            service.complete_checkout(user.id, Some("pi_a".to_owned())),
            service.complete_checkout(user.id, Some("pi_b".to_owned())),
        );

        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        let failed = if a.is_err() { a } else { b };
        assert!(matches!(failed, Err(CheckoutError::EmptyCart)));
        assert_eq!(fx.repo.list_orders_by_user(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_free_report_for_admin() {
        let fx = Fixture::new();
        let admin = fx.user("admin", true).await;
        fx.report("Birth Chart Analysis", 3999).await;
        fx.report("Relationship Compatibility", 4999).await;
        let career = fx.report("Career & Purpose", 4499).await;

        let order = fx
            .service()
            .generate_free_report(&admin, career)
            .await
            .unwrap();

        assert!(order.total.is_zero());
        assert_eq!(order.user_id, admin.id);
        assert_eq!(
            order.payment_reference.as_deref(),
            Some(ADMIN_GENERATED_REFERENCE)
        );
        let items = fx.repo.list_order_items(order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].report_id, career);
        assert!(items[0].price.is_zero());
    }

    #[tokio::test]
    async fn test_free_report_leaves_cart_alone() {
        let fx = Fixture::new();
        let admin = fx.user("admin", true).await;
        let in_cart = fx.report("Lunar Cycles", 2999).await;
        let free = fx.report("Spiritual Path", 5999).await;
        fx.repo.add_cart_item(admin.id, in_cart).await.unwrap();

        fx.service()
            .generate_free_report(&admin, free)
            .await
            .unwrap();

        assert_eq!(fx.repo.list_cart_items(admin.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_free_report_forbidden_for_customers() {
        let fx = Fixture::new();
        let customer = fx.user("luna", false).await;
        let report = fx.report("Solar Return", 3499).await;

        let err = fx
            .service()
            .generate_free_report(&customer, report)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Forbidden));
        assert!(
            fx.repo
                .list_orders_by_user(customer.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_free_report_unknown_report() {
        let fx = Fixture::new();
        let admin = fx.user("admin", true).await;

        let err = fx
            .service()
            .generate_free_report(&admin, ReportId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ReportNotFound(_)));
    }

    #[tokio::test]
    async fn test_payment_intent_converts_to_minor_units() {
        let mut fx = Fixture::new();
        let user = fx.user("luna", false).await;
        fx.payments
            .expect_create_intent()
            .withf(move |amount, metadata| *amount == 8998 && metadata.user_id == user.id)
            .times(1)
            .returning(|_, _| {
                Ok(PaymentIntent {
                    id: "pi_1".to_owned(),
                    client_secret: "pi_1_secret".to_owned(),
                })
            });

        let intent = fx
            .service()
            .begin_payment_intent(user.id, Some(Decimal::new(8998, 2)))
            .await
            .unwrap();
        assert_eq!(intent.client_secret, "pi_1_secret");
    }

    #[tokio::test]
    async fn test_payment_intent_defaults_to_cart_total() {
        let mut fx = Fixture::new();
        let user = fx.user("luna", false).await;
        let a = fx.report("Birth Chart Analysis", 3999).await;
        let b = fx.report("Relationship Compatibility", 4999).await;
        fx.repo.add_cart_item(user.id, a).await.unwrap();
        fx.repo.add_cart_item(user.id, b).await.unwrap();
        fx.payments
            .expect_create_intent()
            .withf(|amount, _| *amount == 8998)
            .times(1)
            .returning(|_, _| {
                Ok(PaymentIntent {
                    id: "pi_1".to_owned(),
                    client_secret: "pi_1_secret".to_owned(),
                })
            });

        fx.service()
            .begin_payment_intent(user.id, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_positive_amount_never_reaches_provider() {
        let mut fx = Fixture::new();
        fx.payments.expect_create_intent().never();
        let service = fx.service();

        for amount in [Decimal::ZERO, Decimal::new(-500, 2), Decimal::new(4, 3)] {
            let err = service
                .begin_payment_intent(UserId::new(1), Some(amount))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                CheckoutError::Payment(PaymentError::InvalidAmount(_))
            ));
        }

        // An empty cart totals zero.
        let err = service
            .begin_payment_intent(UserId::new(1), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::InvalidAmount(_))
        ));
    }

    struct StalledProvider;

    #[async_trait]
    impl PaymentProvider for StalledProvider {
        async fn create_intent(
            &self,
            _amount_minor: i64,
            _metadata: PaymentMetadata,
        ) -> Result<PaymentIntent, PaymentError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(PaymentError::NotConfigured)
        }
    }

    #[tokio::test]
    async fn test_payment_timeout() {
        let repo = InMemoryRepository::new();
        let locks = CheckoutLocks::new();
        let service =
            CheckoutService::new(&repo, &StalledProvider, &locks, Duration::from_millis(20));

        let err = service
            .begin_payment_intent(UserId::new(1), Some(Decimal::ONE))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Payment(PaymentError::Timeout(_))));
    }

    fn forecast() -> Report {
        NewReport {
            title: "Annual Forecast".to_owned(),
            description: "d".to_owned(),
            price: Price::from_cents(6999),
            category: "Forecast".to_owned(),
            preview_url: None,
            icon_name: None,
            rating: Decimal::from(5),
            review_count: 0,
            is_bestseller: false,
            gradient: Gradient::default(),
        }
        .into_report(ReportId::new(12))
    }

    fn mock_cart(user_id: UserId) -> MockRepository {
        let report = forecast();
        let mut repo = MockRepository::new();
        repo.expect_list_cart_items().returning(move |_| {
            Ok(vec![CartItem {
                id: CartItemId::new(1),
                user_id,
                report_id: ReportId::new(12),
                created_at: Utc::now(),
            }])
        });
        repo.expect_get_report()
            .returning(move |_| Ok(Some(report.clone())));
        repo
    }

    #[tokio::test]
    async fn test_failed_placement_is_a_plain_repository_error() {
        let user_id = UserId::new(1);
        let mut repo = mock_cart(user_id);
        repo.expect_place_order()
            .withf(|order, items, consumed| {
                order.total == Price::from_cents(6999)
                    && items.len() == 1
                    && consumed == [CartItemId::new(1)]
            })
            .times(1)
            .returning(|_, _, _| Err(RepositoryError::DataCorruption("disk full".to_owned())));

        let payments = MockPaymentProvider::new();
        let locks = CheckoutLocks::new();
        let err = CheckoutService::new(&repo, &payments, &locks, TIMEOUT)
            .complete_checkout(user_id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Repository(_)));
    }

    #[tokio::test]
    async fn test_short_item_write_is_inconsistent() {
        let user_id = UserId::new(1);
        let mut repo = mock_cart(user_id);
        repo.expect_place_order().times(1).returning(|new, _, _| {
            Ok((
                Order {
                    id: OrderId::new(5),
                    user_id: new.user_id,
                    status: OrderStatus::Pending,
                    total: new.total,
                    payment_reference: new.payment_reference,
                    created_at: Utc::now(),
                },
                Vec::<OrderItem>::new(),
            ))
        });

        let payments = MockPaymentProvider::new();
        let locks = CheckoutLocks::new();
        let err = CheckoutService::new(&repo, &payments, &locks, TIMEOUT)
            .complete_checkout(user_id, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Inconsistent {
                order_id,
                expected: 1,
                written: 0,
            } if order_id == OrderId::new(5)
        ));
    }

    #[tokio::test]
    async fn test_overflowing_cart_writes_nothing() {
        let fx = Fixture::new();
        let user = fx.user("luna", false).await;
        for title in ["Birth Chart Analysis", "Relationship Compatibility"] {
            let report = fx.report(title, 100).await;
            fx.repo
                .update_report_price(report, Price::MAX)
                .await
                .unwrap();
            fx.repo.add_cart_item(user.id, report).await.unwrap();
        }

        let err = fx
            .service()
            .complete_checkout(user.id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Total(PriceError::Overflow)));
        assert!(fx.repo.list_orders_by_user(user.id).await.unwrap().is_empty());
        assert_eq!(fx.repo.list_cart_items(user.id).await.unwrap().len(), 2);

        // The intent total is checked the same way.
        let err = fx
            .service()
            .begin_payment_intent(user.id, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_huge_amount_is_rejected_before_provider() {
        let mut fx = Fixture::new();
        fx.payments.expect_create_intent().never();

        for amount in [Decimal::MAX, Decimal::new(10_000_000_000, 2)] {
            let err = fx
                .service()
                .begin_payment_intent(UserId::new(1), Some(amount))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                CheckoutError::Payment(PaymentError::InvalidAmount(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_checkout_leaves_other_carts_alone() {
        let fx = Fixture::new();
        let luna = fx.user("luna", false).await;
        let sol = fx.user("sol", false).await;
        let report = fx.report("Solar Return", 3499).await;
        fx.repo.add_cart_item(luna.id, report).await.unwrap();
        fx.repo.add_cart_item(sol.id, report).await.unwrap();

        fx.service().complete_checkout(luna.id, None).await.unwrap();

        assert!(fx.repo.list_cart_items(luna.id).await.unwrap().is_empty());
        assert_eq!(fx.repo.list_cart_items(sol.id).await.unwrap().len(), 1);
    }
}
