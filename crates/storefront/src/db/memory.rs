//! In-process repository backed by ordered maps.
//!
//! All tables sit behind one lock, so every trait method is atomic with
//! respect to the others. Nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use cosmic_blueprints_core::{
    CartItemId, ContentId, Email, OrderId, OrderItemId, OrderStatus, Price, ReportId,
    TestimonialId, UserId, Username,
};

use super::{EMAIL_TAKEN, Repository, RepositoryError, USERNAME_TAKEN};
use crate::models::{
    CartItem, EducationalContent, NewEducationalContent, NewOrder, NewOrderItem, NewReport,
    NewTestimonial, NewUser, Order, OrderItem, Report, Testimonial, User,
};

/// Monotonic id source. Ids start at 1 and are never handed out twice.
#[derive(Debug, Default)]
struct Sequence(i32);

impl Sequence {
    fn next(&mut self) -> Result<i32, RepositoryError> {
        self.0 = self
            .0
            .checked_add(1)
            .ok_or_else(|| RepositoryError::DataCorruption("id sequence exhausted".to_owned()))?;
        Ok(self.0)
    }
}

#[derive(Debug)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, StoredUser>,
    reports: BTreeMap<ReportId, Report>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<OrderItemId, OrderItem>,
    content: BTreeMap<ContentId, EducationalContent>,
    testimonials: BTreeMap<TestimonialId, Testimonial>,

    user_seq: Sequence,
    report_seq: Sequence,
    cart_item_seq: Sequence,
    order_seq: Sequence,
    order_item_seq: Sequence,
    content_seq: Sequence,
    testimonial_seq: Sequence,
}

impl Tables {
    fn find_user_by_username(&self, username: &Username) -> Option<&StoredUser> {
        let key = username.normalized();
        self.users
            .values()
            .find(|stored| stored.user.username.normalized() == key)
    }

    fn find_user_by_email(&self, email: &Email) -> Option<&StoredUser> {
        let key = email.normalized();
        self.users
            .values()
            .find(|stored| stored.user.email.normalized() == key)
    }
}

/// Repository that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|stored| stored.user.clone()))
    }

    async fn get_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .find_user_by_username(username)
            .map(|stored| stored.user.clone()))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .find_user_by_email(email)
            .map(|stored| stored.user.clone()))
    }

    async fn get_password_hash(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .find_user_by_username(username)
            .map(|stored| (stored.user.clone(), stored.password_hash.clone())))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables.find_user_by_username(&user.username).is_some() {
            return Err(RepositoryError::Conflict(USERNAME_TAKEN.to_owned()));
        }
        if tables.find_user_by_email(&user.email).is_some() {
            return Err(RepositoryError::Conflict(EMAIL_TAKEN.to_owned()));
        }

        let id = UserId::new(tables.user_seq.next()?);
        let created = User {
            id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            birth: user.birth,
            created_at: Utc::now(),
        };
        tables.users.insert(
            id,
            StoredUser {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn get_report(&self, id: ReportId) -> Result<Option<Report>, RepositoryError> {
        Ok(self.tables.read().await.reports.get(&id).cloned())
    }

    async fn list_reports(&self) -> Result<Vec<Report>, RepositoryError> {
        Ok(self.tables.read().await.reports.values().cloned().collect())
    }

    async fn list_reports_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Report>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reports
            .values()
            .filter(|report| report.category == category)
            .cloned()
            .collect())
    }

    async fn create_report(&self, report: NewReport) -> Result<Report, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = ReportId::new(tables.report_seq.next()?);
        let report = report.into_report(id);
        tables.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn update_report_price(
        &self,
        id: ReportId,
        price: Price,
    ) -> Result<Report, RepositoryError> {
        let mut tables = self.tables.write().await;
        let report = tables
            .reports
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        report.price = price;
        Ok(report.clone())
    }

    async fn delete_report(&self, id: ReportId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.reports.remove(&id).is_some())
    }

    async fn list_cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_items
            .values()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        Ok(self.tables.read().await.cart_items.get(&id).cloned())
    }

    async fn add_cart_item(
        &self,
        user_id: UserId,
        report_id: ReportId,
    ) -> Result<(CartItem, bool), RepositoryError> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .cart_items
            .values()
            .find(|item| item.user_id == user_id && item.report_id == report_id)
        {
            return Ok((existing.clone(), false));
        }

        let id = CartItemId::new(tables.cart_item_seq.next()?);
        let item = CartItem {
            id,
            user_id,
            report_id,
            created_at: Utc::now(),
        };
        tables.cart_items.insert(id, item.clone());
        Ok((item, true))
    }

    async fn remove_cart_item(&self, id: CartItemId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.cart_items.remove(&id).is_some())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|_, item| item.user_id != user_id);
        let removed = before - tables.cart_items.len();
        u64::try_from(removed).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }

    async fn place_order(
        &self,
        order: NewOrder,
        items: &[NewOrderItem],
        consumed: &[CartItemId],
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        let mut tables = self.tables.write().await;

        // Allocate every id before touching a table so a failure writes nothing.
        let order_id = OrderId::new(tables.order_seq.next()?);
        let item_ids = items
            .iter()
            .map(|_| tables.order_item_seq.next().map(OrderItemId::new))
            .collect::<Result<Vec<_>, _>>()?;

        let now = Utc::now();
        let order = Order {
            id: order_id,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            total: order.total,
            payment_reference: order.payment_reference,
            created_at: now,
        };
        let rows: Vec<OrderItem> = item_ids
            .into_iter()
            .zip(items)
            .map(|(id, item)| OrderItem {
                id,
                order_id,
                report_id: item.report_id,
                price: item.price,
                created_at: now,
            })
            .collect();

        tables.orders.insert(order_id, order.clone());
        for row in &rows {
            tables.order_items.insert(row.id, row.clone());
        }
        tables
            .cart_items
            .retain(|id, item| item.user_id != order.user_id || !consumed.contains(id));

        Ok((order, rows))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        // Ids grow with time, so reverse id order is newest first.
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.status = status;
        Ok(order.clone())
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .order_items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_content(&self) -> Result<Vec<EducationalContent>, RepositoryError> {
        Ok(self.tables.read().await.content.values().cloned().collect())
    }

    async fn get_content(
        &self,
        id: ContentId,
    ) -> Result<Option<EducationalContent>, RepositoryError> {
        Ok(self.tables.read().await.content.get(&id).cloned())
    }

    async fn list_content_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<EducationalContent>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .content
            .values()
            .filter(|content| content.category == category)
            .cloned()
            .collect())
    }

    async fn create_content(
        &self,
        content: NewEducationalContent,
    ) -> Result<EducationalContent, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = ContentId::new(tables.content_seq.next()?);
        let content = content.into_content(id);
        tables.content.insert(id, content.clone());
        Ok(content)
    }

    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .testimonials
            .values()
            .cloned()
            .collect())
    }

    async fn create_testimonial(
        &self,
        testimonial: NewTestimonial,
    ) -> Result<Testimonial, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = TestimonialId::new(tables.testimonial_seq.next()?);
        let testimonial = testimonial.into_testimonial(id);
        tables.testimonials.insert(id, testimonial.clone());
        Ok(testimonial)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{BirthDetails, Gradient};
    use rust_decimal::Decimal;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: Username::parse(username).unwrap(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            is_admin: false,
            birth: BirthDetails::default(),
        }
    }

    fn new_report(title: &str, cents: u32) -> NewReport {
        NewReport {
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
        }
    }

    #[tokio::test]
    async fn test_user_uniqueness_ignores_case() {
        let repo = InMemoryRepository::new();
        repo.create_user(new_user("Luna", "luna@example.com"))
            .await
            .unwrap();

        let err = repo
            .create_user(new_user("LUNA", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref m) if m == USERNAME_TAKEN));

        let err = repo
            .create_user(new_user("sol", "Luna@Example.COM"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref m) if m == EMAIL_TAKEN));

        let found = repo
            .get_user_by_username(&Username::parse("lUnA").unwrap())
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let repo = InMemoryRepository::new();
        let user = repo
            .create_user(new_user("luna", "luna@example.com"))
            .await
            .unwrap();
        let report = repo.create_report(new_report("A", 100)).await.unwrap();

        let (first, _) = repo.add_cart_item(user.id, report.id).await.unwrap();
        assert!(repo.remove_cart_item(first.id).await.unwrap());
        let (second, created) = repo.add_cart_item(user.id, report.id).await.unwrap();

        assert!(created);
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_add_cart_item_is_unique_per_user_and_report() {
        let repo = InMemoryRepository::new();
        let report = repo.create_report(new_report("A", 100)).await.unwrap();
        let alice = UserId::new(1);
        let bob = UserId::new(2);

        let (a1, created) = repo.add_cart_item(alice, report.id).await.unwrap();
        assert!(created);
        let (a2, created) = repo.add_cart_item(alice, report.id).await.unwrap();
        assert!(!created);
        assert_eq!(a1.id, a2.id);

        let (_, created) = repo.add_cart_item(bob, report.id).await.unwrap();
        assert!(created);

        assert_eq!(repo.list_cart_items(alice).await.unwrap().len(), 1);
        assert_eq!(repo.clear_cart(alice).await.unwrap(), 1);
        assert_eq!(repo.clear_cart(alice).await.unwrap(), 0);
        assert_eq!(repo.list_cart_items(bob).await.unwrap().len(), 1);
    }

    fn new_order(user_id: UserId, cents: u32) -> NewOrder {
        NewOrder {
            user_id,
            total: Price::from_cents(cents),
            payment_reference: None,
        }
    }

    #[tokio::test]
    async fn test_orders_newest_first_with_items() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let (first, first_items) = repo
            .place_order(new_order(user, 100), &[], &[])
            .await
            .unwrap();
        let (second, items) = repo
            .place_order(
                new_order(user, 200),
                &[NewOrderItem {
                    report_id: ReportId::new(3),
                    price: Price::from_cents(200),
                }],
                &[],
            )
            .await
            .unwrap();

        assert_eq!(first.status, OrderStatus::Pending);
        assert!(first_items.is_empty());
        let listed = repo.list_orders_by_user(user).await.unwrap();
        assert_eq!(listed.iter().map(|o| o.id).collect::<Vec<_>>(), [
            second.id, first.id
        ]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].order_id, second.id);
        assert_eq!(repo.list_order_items(second.id).await.unwrap(), items);
        assert!(repo.list_order_items(first.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_removes_only_consumed_lines() {
        let repo = InMemoryRepository::new();
        let a = repo.create_report(new_report("A", 100)).await.unwrap();
        let b = repo.create_report(new_report("B", 200)).await.unwrap();
        let alice = UserId::new(1);
        let bob = UserId::new(2);

        let (bought, _) = repo.add_cart_item(alice, a.id).await.unwrap();
        let (kept, _) = repo.add_cart_item(alice, b.id).await.unwrap();
        let (other, _) = repo.add_cart_item(bob, a.id).await.unwrap();

        // Bob's line is listed but is not Alice's to consume.
        repo.place_order(
            new_order(alice, 100),
            &[NewOrderItem {
                report_id: a.id,
                price: a.price,
            }],
            &[bought.id, other.id],
        )
        .await
        .unwrap();

        let left: Vec<_> = repo
            .list_cart_items(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(left, [kept.id]);
        assert_eq!(repo.list_cart_items(bob).await.unwrap()[0].id, other.id);
    }

    #[tokio::test]
    async fn test_cart_lines_outlive_report_deletion() {
        let repo = InMemoryRepository::new();
        let report = repo.create_report(new_report("A", 100)).await.unwrap();
        let user = UserId::new(1);
        repo.add_cart_item(user, report.id).await.unwrap();

        assert!(repo.delete_report(report.id).await.unwrap());

        let lines = repo.list_cart_items(user).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].report_id, report.id);
    }

    #[tokio::test]
    async fn test_update_report_price_missing() {
        let repo = InMemoryRepository::new();
        let err = repo
            .update_report_price(ReportId::new(1), Price::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
