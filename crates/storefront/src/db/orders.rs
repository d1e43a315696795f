//! Order repository.
//!
//! Orders are written in two places: checkout (creation, session
//! attachment, cancellation on gateway failure) and the payment webhook
//! (see [`super::payments`]). Admin status changes go through
//! [`OrderRepository::transition`], which only succeeds from the expected
//! current status.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use handicrafts_core::{CurrencyCode, Money, OrderId, OrderStatus, UserId, VendorId};

use super::RepositoryError;
use crate::models::{Order, OrderItem, ShippingAddress};

pub(super) const ORDER_COLUMNS: &str = "id, user_id, vendor_id, items, total_minor, currency, \
                                        status, shipping_address, checkout_session_id, \
                                        created_at, updated_at, paid_at";

#[derive(sqlx::FromRow)]
pub(super) struct OrderRow {
    id: OrderId,
    user_id: UserId,
    vendor_id: VendorId,
    items: Json<Vec<OrderItem>>,
    total_minor: i64,
    currency: CurrencyCode,
    status: OrderStatus,
    shipping_address: Json<ShippingAddress>,
    checkout_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            vendor_id: r.vendor_id,
            items: r.items.0,
            total: Money::new(r.total_minor, r.currency),
            status: r.status,
            shipping_address: r.shipping_address.0,
            checkout_session_id: r.checkout_session_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
            paid_at: r.paid_at,
        }
    }
}

/// An order about to be created at checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub vendor_id: VendorId,
    pub items: Vec<OrderItem>,
    pub total: Money,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create one `PENDING` order per entry in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; no order is
    /// created in that case.
    pub async fn create_pending(
        &self,
        user_id: UserId,
        orders: &[NewOrder],
        shipping_address: &ShippingAddress,
    ) -> Result<Vec<Order>, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(orders.len());

        for order in orders {
            let row: OrderRow = sqlx::query_as(&format!(
                "INSERT INTO orders (user_id, vendor_id, items, total_minor, currency, status, \
                                     shipping_address, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 RETURNING {ORDER_COLUMNS}"
            ))
            .bind(user_id)
            .bind(order.vendor_id)
            .bind(Json(&order.items))
            .bind(order.total.amount_minor)
            .bind(order.total.currency)
            .bind(OrderStatus::Pending)
            .bind(Json(shipping_address))
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            created.push(Order::from(row));
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Store the payment session on freshly created orders and empty the
    /// buyer's saved cart, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either write fails.
    pub async fn attach_checkout_session(
        &self,
        user_id: UserId,
        order_ids: &[OrderId],
        checkout_session_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("UPDATE orders SET checkout_session_id = ");
        builder
            .push_bind(checkout_session_id)
            .push(", updated_at = ")
            .push_bind(Utc::now())
            .push(" WHERE user_id = ")
            .push_bind(user_id)
            .push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in order_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        builder.build().execute(&mut *tx).await?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Cancel orders that are still `PENDING`. Other orders are left alone.
    ///
    /// Returns the number of orders cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn cancel_pending(&self, order_ids: &[OrderId]) -> Result<u64, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE orders SET status = ");
        builder
            .push_bind(OrderStatus::Cancelled)
            .push(", updated_at = ")
            .push_bind(Utc::now())
            .push(" WHERE status = ")
            .push_bind(OrderStatus::Pending)
            .push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in order_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Move an order from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist, or
    /// `RepositoryError::Conflict` if it is not currently in `from`.
    pub async fn transition(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ? \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .bind(from)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        match self.get_by_id(id).await? {
            Some(order) => Err(RepositoryError::Conflict(format!(
                "order {id} is {}, expected {from}",
                order.status
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(Order::from))
    }

    /// A buyer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// A vendor's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE vendor_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }
}
