//! `PostgreSQL` repository.
//!
//! Queries are checked at runtime so the crate builds without a live
//! database.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use cosmic_blueprints_core::{
    CartItemId, ContentId, Email, OrderId, OrderStatus, Price, ReportId, UserId, Username,
};

use super::{EMAIL_TAKEN, Repository, RepositoryError, USERNAME_TAKEN};
use crate::models::{
    BirthDetails, CartItem, EducationalContent, Gradient, NewEducationalContent, NewOrder,
    NewOrderItem, NewReport, NewTestimonial, NewUser, Order, OrderItem, Report, Testimonial, User,
};

const USER_COLUMNS: &str = "id, username, email, is_admin, birth_date, birth_time, \
                            birth_location, created_at";
const REPORT_COLUMNS: &str = "id, title, description, price, category, preview_url, icon_name, \
                              rating, review_count, is_bestseller, gradient_from, gradient_to";
const CART_COLUMNS: &str = "id, user_id, report_id, created_at";
const ORDER_COLUMNS: &str = "id, user_id, status, total, payment_reference, created_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, report_id, price, created_at";
const CONTENT_COLUMNS: &str =
    "id, title, description, category, icon_name, gradient_from, gradient_to, content";
const TESTIMONIAL_COLUMNS: &str = "id, name, testimonial, report_name, rating, avatar_color";

/// Repository over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn price(row: &PgRow, column: &str) -> Result<Price, RepositoryError> {
    let amount: Decimal = row.try_get(column)?;
    Price::new(amount)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

fn user_from_row(row: &PgRow) -> Result<User, RepositoryError> {
    let username: String = row.try_get("username")?;
    let email: String = row.try_get("email")?;

    Ok(User {
        id: row.try_get("id")?,
        username: Username::parse(&username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?,
        email: Email::parse(&email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?,
        is_admin: row.try_get("is_admin")?,
        birth: BirthDetails {
            birth_date: row.try_get("birth_date")?,
            birth_time: row.try_get("birth_time")?,
            birth_location: row.try_get("birth_location")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn report_from_row(row: &PgRow) -> Result<Report, RepositoryError> {
    Ok(Report {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: price(row, "price")?,
        category: row.try_get("category")?,
        preview_url: row.try_get("preview_url")?,
        icon_name: row.try_get("icon_name")?,
        rating: row.try_get("rating")?,
        review_count: row.try_get("review_count")?,
        is_bestseller: row.try_get("is_bestseller")?,
        gradient: Gradient {
            gradient_from: row.try_get("gradient_from")?,
            gradient_to: row.try_get("gradient_to")?,
        },
    })
}

fn cart_item_from_row(row: &PgRow) -> Result<CartItem, RepositoryError> {
    Ok(CartItem {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        report_id: row.try_get("report_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, RepositoryError> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        status: status.parse().map_err(RepositoryError::DataCorruption)?,
        total: price(row, "total")?,
        payment_reference: row.try_get("payment_reference")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_item_from_row(row: &PgRow) -> Result<OrderItem, RepositoryError> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        report_id: row.try_get("report_id")?,
        price: price(row, "price")?,
        created_at: row.try_get("created_at")?,
    })
}

fn content_from_row(row: &PgRow) -> Result<EducationalContent, RepositoryError> {
    Ok(EducationalContent {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        icon_name: row.try_get("icon_name")?,
        gradient: Gradient {
            gradient_from: row.try_get("gradient_from")?,
            gradient_to: row.try_get("gradient_to")?,
        },
        content: row.try_get("content")?,
    })
}

fn testimonial_from_row(row: &PgRow) -> Result<Testimonial, RepositoryError> {
    Ok(Testimonial {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        testimonial: row.try_get("testimonial")?,
        report_name: row.try_get("report_name")?,
        rating: row.try_get("rating")?,
        avatar_color: row.try_get("avatar_color")?,
    })
}

fn collect<T>(
    rows: &[PgRow],
    map: fn(&PgRow) -> Result<T, RepositoryError>,
) -> Result<Vec<T>, RepositoryError> {
    rows.iter().map(map).collect()
}

/// Map a unique violation on the user indexes to the matching conflict.
fn user_conflict(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let message = match db_err.constraint() {
            Some("users_email_lower_key") => EMAIL_TAKEN,
            _ => USERNAME_TAKEN,
        };
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl Repository for PgRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_password_hash(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = user_from_row(&row)?;
        let hash: String = row.try_get("password_hash")?;
        Ok(Some((user, hash)))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO users (username, email, password_hash, is_admin,
                               birth_date, birth_time, birth_location)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.birth.birth_date)
        .bind(&user.birth.birth_time)
        .bind(&user.birth.birth_location)
        .fetch_one(&self.pool)
        .await
        .map_err(user_conflict)?;

        user_from_row(&row)
    }

    async fn get_report(&self, id: ReportId) -> Result<Option<Report>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(report_from_row).transpose()
    }

    async fn list_reports(&self) -> Result<Vec<Report>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM reports ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        collect(&rows, report_from_row)
    }

    async fn list_reports_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Report>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE category = $1 ORDER BY id"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        collect(&rows, report_from_row)
    }

    async fn create_report(&self, report: NewReport) -> Result<Report, RepositoryError> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO reports (title, description, price, category, preview_url, icon_name,
                                 rating, review_count, is_bestseller, gradient_from, gradient_to)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {REPORT_COLUMNS}
            "
        ))
        .bind(&report.title)
        .bind(&report.description)
        .bind(report.price.amount())
        .bind(&report.category)
        .bind(&report.preview_url)
        .bind(&report.icon_name)
        .bind(report.rating)
        .bind(report.review_count)
        .bind(report.is_bestseller)
        .bind(&report.gradient.gradient_from)
        .bind(&report.gradient.gradient_to)
        .fetch_one(&self.pool)
        .await?;
        report_from_row(&row)
    }

    async fn update_report_price(
        &self,
        id: ReportId,
        price: Price,
    ) -> Result<Report, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE reports SET price = $2 WHERE id = $1 RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(price.amount())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        report_from_row(&row)
    }

    async fn delete_report(&self, id: ReportId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(&rows, cart_item_from_row)
    }

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CART_COLUMNS} FROM cart_items WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(cart_item_from_row).transpose()
    }

    async fn add_cart_item(
        &self,
        user_id: UserId,
        report_id: ReportId,
    ) -> Result<(CartItem, bool), RepositoryError> {
        let inserted = sqlx::query(&format!(
            r"
            INSERT INTO cart_items (user_id, report_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT cart_items_user_report_key DO NOTHING
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((cart_item_from_row(&row)?, true));
        }

        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 AND report_id = $2"
        ))
        .bind(user_id)
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?
        // Removed between the conflict and this read.
        .ok_or_else(|| RepositoryError::Conflict("cart item changed concurrently".to_owned()))?;
        Ok((cart_item_from_row(&row)?, false))
    }

    async fn remove_cart_item(&self, id: CartItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn place_order(
        &self,
        order: NewOrder,
        items: &[NewOrderItem],
        consumed: &[CartItemId],
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r"
            INSERT INTO orders (user_id, status, total, payment_reference)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(order.total.amount())
        .bind(&order.payment_reference)
        .fetch_one(&mut *tx)
        .await?;
        let placed = order_from_row(&row)?;

        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query(&format!(
                r"
                INSERT INTO order_items (order_id, report_id, price)
                VALUES ($1, $2, $3)
                RETURNING {ORDER_ITEM_COLUMNS}
                "
            ))
            .bind(placed.id)
            .bind(item.report_id)
            .bind(item.price.amount())
            .fetch_one(&mut *tx)
            .await?;
            created.push(order_item_from_row(&row)?);
        }

        let consumed: Vec<i32> = consumed.iter().map(CartItemId::as_i32).collect();
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)")
            .bind(order.user_id)
            .bind(&consumed)
            .execute(&mut *tx)
            .await?;

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await?;
        Ok((placed, created))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(&rows, order_from_row)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        order_from_row(&row)
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        collect(&rows, order_item_from_row)
    }

    async fn list_content(&self) -> Result<Vec<EducationalContent>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM educational_content ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        collect(&rows, content_from_row)
    }

    async fn get_content(
        &self,
        id: ContentId,
    ) -> Result<Option<EducationalContent>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM educational_content WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(content_from_row).transpose()
    }

    async fn list_content_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<EducationalContent>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM educational_content WHERE category = $1 ORDER BY id"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        collect(&rows, content_from_row)
    }

    async fn create_content(
        &self,
        content: NewEducationalContent,
    ) -> Result<EducationalContent, RepositoryError> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO educational_content (title, description, category, icon_name,
                                             gradient_from, gradient_to, content)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CONTENT_COLUMNS}
            "
        ))
        .bind(&content.title)
        .bind(&content.description)
        .bind(&content.category)
        .bind(&content.icon_name)
        .bind(&content.gradient.gradient_from)
        .bind(&content.gradient.gradient_to)
        .bind(&content.content)
        .fetch_one(&self.pool)
        .await?;
        content_from_row(&row)
    }

    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        collect(&rows, testimonial_from_row)
    }

    async fn create_testimonial(
        &self,
        testimonial: NewTestimonial,
    ) -> Result<Testimonial, RepositoryError> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO testimonials (name, testimonial, report_name, rating, avatar_color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TESTIMONIAL_COLUMNS}
            "
        ))
        .bind(&testimonial.name)
        .bind(&testimonial.testimonial)
        .bind(&testimonial.report_name)
        .bind(testimonial.rating)
        .bind(&testimonial.avatar_color)
        .fetch_one(&self.pool)
        .await?;
        testimonial_from_row(&row)
    }
}
