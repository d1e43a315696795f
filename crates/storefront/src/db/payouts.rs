//! Payout repository.
//!
//! Payouts are inserted by the payment webhook transaction in
//! [`super::payments`]; this repository reads them and records
//! disbursement.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use handicrafts_core::{CurrencyCode, Money, OrderId, PayoutId, PayoutStatus, VendorId};

use super::RepositoryError;
use crate::models::Payout;

const PAYOUT_COLUMNS: &str =
    "id, vendor_id, order_id, amount_minor, currency, status, created_at, paid_at";

#[derive(sqlx::FromRow)]
struct PayoutRow {
    id: PayoutId,
    vendor_id: VendorId,
    order_id: OrderId,
    amount_minor: i64,
    currency: CurrencyCode,
    status: PayoutStatus,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl From<PayoutRow> for Payout {
    fn from(r: PayoutRow) -> Self {
        Self {
            id: r.id,
            vendor_id: r.vendor_id,
            order_id: r.order_id,
            amount: Money::new(r.amount_minor, r.currency),
            status: r.status,
            created_at: r.created_at,
            paid_at: r.paid_at,
        }
    }
}

/// Repository for payout database operations.
pub struct PayoutRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PayoutRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payout>, RepositoryError> {
        let row: Option<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE order_id = ?"
        ))
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Payout::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_vendor(&self, vendor_id: VendorId) -> Result<Vec<Payout>, RepositoryError> {
        let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE vendor_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Payout::from).collect())
    }

    /// All payouts, pending first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Payout>, RepositoryError> {
        let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts \
             ORDER BY CASE status WHEN 'PENDING' THEN 0 ELSE 1 END, created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Payout::from).collect())
    }

    /// Record that a pending payout has been disbursed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payout doesn't exist, or
    /// `RepositoryError::Conflict` if it was already paid.
    pub async fn mark_paid(&self, id: PayoutId) -> Result<Payout, RepositoryError> {
        let row: Option<PayoutRow> = sqlx::query_as(&format!(
            "UPDATE payouts SET status = ?, paid_at = ? WHERE id = ? AND status = ? \
             RETURNING {PAYOUT_COLUMNS}"
        ))
        .bind(PayoutStatus::Paid)
        .bind(Utc::now())
        .bind(id)
        .bind(PayoutStatus::Pending)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM payouts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        match exists {
            Some(_) => Err(RepositoryError::Conflict(format!("payout {id} already paid"))),
            None => Err(RepositoryError::NotFound),
        }
    }
}
