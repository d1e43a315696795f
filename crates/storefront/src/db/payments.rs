//! Payment confirmation, applied as one transaction.
//!
//! A confirmed payment touches four tables: the webhook event log, the
//! orders, product stock and payouts. All of it commits together or not at
//! all, and the event log insert comes first so a redelivered event is
//! detected before anything else is written. Only `PENDING` orders move to
//! `PAID`, so the stock decrement and payout insert run once per order even
//! if two different events reference the same checkout session.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use handicrafts_core::{OrderId, OrderStatus, PayoutStatus};

use super::RepositoryError;
use super::orders::{ORDER_COLUMNS, OrderRow};
use crate::models::Order;

/// A payment confirmation received from the provider.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation<'a> {
    /// Provider event ID, the idempotency key.
    pub event_id: &'a str,
    /// Provider event type, stored for auditing.
    pub event_type: &'a str,
    /// Checkout session the payment belongs to.
    pub checkout_session_id: Option<&'a str>,
    /// Order IDs echoed back from the session metadata, used when no order
    /// carries the session ID.
    pub order_ids: &'a [OrderId],
}

/// What applying a confirmation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The event was processed before. Nothing was written.
    Duplicate,
    /// The event was recorded.
    Applied {
        /// Orders moved from `PENDING` to `PAID`.
        paid: Vec<OrderId>,
        /// Referenced orders that were not `PENDING` and were left alone.
        skipped: Vec<OrderId>,
    },
}

/// Repository for the payment confirmation transaction.
pub struct PaymentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PaymentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Mark the referenced orders paid, decrement stock and create payouts.
    ///
    /// Stock never goes below zero. A shortfall (more units paid for than
    /// remain) is clamped and logged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails. The
    /// transaction is rolled back, including the event record, so the
    /// provider's retry is processed from scratch.
    #[tracing::instrument(skip(self, confirmation), fields(event_id = %confirmation.event_id))]
    pub async fn apply(
        &self,
        confirmation: &PaymentConfirmation<'_>,
    ) -> Result<PaymentOutcome, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let recorded = sqlx::query(
            "INSERT INTO processed_webhook_events (event_id, event_type, processed_at) \
             VALUES (?, ?, ?) ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(confirmation.event_id)
        .bind(confirmation.event_type)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if recorded.rows_affected() == 0 {
            tracing::info!("Duplicate payment event, skipping");
            return Ok(PaymentOutcome::Duplicate);
        }

        let mut orders: Vec<Order> = match confirmation.checkout_session_id {
            Some(session_id) => {
                let rows: Vec<OrderRow> = sqlx::query_as(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE checkout_session_id = ? ORDER BY id"
                ))
                .bind(session_id)
                .fetch_all(&mut *tx)
                .await?;
                rows.into_iter().map(Order::from).collect()
            }
            None => Vec::new(),
        };

        if orders.is_empty() && !confirmation.order_ids.is_empty() {
            let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE id IN ("
            ));
            let mut separated = builder.separated(", ");
            for id in confirmation.order_ids {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") ORDER BY id");
            let rows: Vec<OrderRow> = builder.build_query_as().fetch_all(&mut *tx).await?;
            orders = rows.into_iter().map(Order::from).collect();
        }

        if orders.is_empty() {
            tracing::warn!(
                checkout_session_id = ?confirmation.checkout_session_id,
                "Payment event references no known orders"
            );
        }

        let mut paid = Vec::new();
        let mut skipped = Vec::new();

        for order in orders {
            let updated = sqlx::query(
                "UPDATE orders SET status = ?, paid_at = ?, updated_at = ? \
                 WHERE id = ? AND status = ?",
            )
            .bind(OrderStatus::Paid)
            .bind(now)
            .bind(now)
            .bind(order.id)
            .bind(OrderStatus::Pending)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                tracing::warn!(
                    order_id = %order.id,
                    status = %order.status,
                    "Order is not pending, skipping payment side effects"
                );
                skipped.push(order.id);
                continue;
            }

            for item in &order.items {
                let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
                    .bind(item.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;

                let Some(stock) = stock else {
                    tracing::warn!(product_id = %item.product_id, "Paid product no longer exists");
                    continue;
                };

                let wanted = i64::from(item.quantity);
                if stock < wanted {
                    tracing::warn!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        stock,
                        wanted,
                        shortfall = wanted - stock,
                        "Stock shortfall on paid order, clamping at zero"
                    );
                }

                sqlx::query(
                    "UPDATE products SET stock = MAX(stock - ?, 0), updated_at = ? WHERE id = ?",
                )
                .bind(wanted)
                .bind(now)
                .bind(item.product_id)
                .execute(&mut *tx)
                .await?;
            }

            let payout = order.total.vendor_payout();
            sqlx::query(
                "INSERT INTO payouts (vendor_id, order_id, amount_minor, currency, status, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT (order_id) DO NOTHING",
            )
            .bind(order.vendor_id)
            .bind(order.id)
            .bind(payout.amount_minor)
            .bind(payout.currency)
            .bind(PayoutStatus::Pending)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            paid.push(order.id);
        }

        tx.commit().await?;

        tracing::info!(paid = paid.len(), skipped = skipped.len(), "Payment applied");
        Ok(PaymentOutcome::Applied { paid, skipped })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use handicrafts_core::{CurrencyCode, Money};

    use super::*;
    use crate::db::orders::NewOrder;
    use crate::db::test_support::{address, approved_vendor, pool, product, user};
    use crate::db::{OrderRepository, PayoutRepository, ProductRepository};
    use crate::models::OrderItem;

    async fn pending_order(pool: &SqlitePool, stock: i64, quantity: u32) -> (Order, Vec<OrderId>) {
        let buyer = user(pool, "buyer@example.com").await;
        let vendor = approved_vendor(pool, "maker@example.com").await;
        let vase = product(pool, vendor.id, "Terracotta Vase", 59_900, stock).await;
        let repo = OrderRepository::new(pool);
        let orders = repo
            .create_pending(
                buyer.id,
                &[NewOrder {
                    vendor_id: vendor.id,
                    items: vec![OrderItem {
                        product_id: vase.id,
                        title: "Terracotta Vase".to_string(),
                        quantity,
                        unit_price_minor: 59_900,
                    }],
                    total: Money::new(59_900 * i64::from(quantity), CurrencyCode::Inr),
                }],
                &address(),
            )
            .await
            .unwrap();
        let ids = orders.iter().map(|o| o.id).collect::<Vec<_>>();
        repo.attach_checkout_session(buyer.id, &ids, "cs_test_abc")
            .await
            .unwrap();
        (orders.into_iter().next().unwrap(), ids)
    }

    fn confirmation<'a>(event_id: &'a str, ids: &'a [OrderId]) -> PaymentConfirmation<'a> {
        PaymentConfirmation {
            event_id,
            event_type: "checkout.session.completed",
            checkout_session_id: Some("cs_test_abc"),
            order_ids: ids,
        }
    }

    #[tokio::test]
    async fn test_apply_marks_paid_decrements_stock_and_creates_payout() {
        let pool = pool().await;
        let (order, ids) = pending_order(&pool, 5, 2).await;

        let outcome = PaymentRepository::new(&pool)
            .apply(&confirmation("evt_1", &ids))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PaymentOutcome::Applied {
                paid: vec![order.id],
                skipped: vec![]
            }
        );

        let paid = OrderRepository::new(&pool)
            .get_by_id(order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert!(paid.paid_at.is_some());

        let product = ProductRepository::new(&pool)
            .get_by_id(order.items[0].product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.stock, 3);

        let payout = PayoutRepository::new(&pool)
            .get_by_order(order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payout.amount.amount_minor, 107_820);
        assert_eq!(payout.status, PayoutStatus::Pending);
    }

    #[tokio::test]
    async fn test_replayed_event_is_a_no_op() {
        let pool = pool().await;
        let (order, ids) = pending_order(&pool, 5, 1).await;
        let repo = PaymentRepository::new(&pool);

        repo.apply(&confirmation("evt_1", &ids)).await.unwrap();
        let second = repo.apply(&confirmation("evt_1", &ids)).await.unwrap();
        assert_eq!(second, PaymentOutcome::Duplicate);

        let product = ProductRepository::new(&pool)
            .get_by_id(order.items[0].product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.stock, 4);
    }

    #[tokio::test]
    async fn test_new_event_for_paid_order_skips_side_effects() {
        let pool = pool().await;
        let (order, ids) = pending_order(&pool, 5, 1).await;
        let repo = PaymentRepository::new(&pool);

        repo.apply(&confirmation("evt_1", &ids)).await.unwrap();
        let outcome = repo.apply(&confirmation("evt_2", &ids)).await.unwrap();
        assert_eq!(
            outcome,
            PaymentOutcome::Applied {
                paid: vec![],
                skipped: vec![order.id]
            }
        );

        let product = ProductRepository::new(&pool)
            .get_by_id(order.items[0].product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.stock, 4);
    }

    #[tokio::test]
    async fn test_stock_clamps_at_zero() {
        let pool = pool().await;
        let (order, ids) = pending_order(&pool, 1, 3).await;

        PaymentRepository::new(&pool)
            .apply(&confirmation("evt_1", &ids))
            .await
            .unwrap();

        let product = ProductRepository::new(&pool)
            .get_by_id(order.items[0].product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.stock, 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_metadata_order_ids() {
        let pool = pool().await;
        let (order, ids) = pending_order(&pool, 5, 1).await;

        let outcome = PaymentRepository::new(&pool)
            .apply(&PaymentConfirmation {
                event_id: "evt_meta",
                event_type: "checkout.session.completed",
                checkout_session_id: Some("cs_unknown"),
                order_ids: &ids,
            })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PaymentOutcome::Applied {
                paid: vec![order.id],
                skipped: vec![]
            }
        );
    }
}
