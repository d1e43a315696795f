//! Cart repository for signed-in users.

use chrono::Utc;
use sqlx::SqlitePool;

use handicrafts_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::CartLine;
use crate::models::cart::MAX_LINE_QUANTITY;

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: ProductId,
    quantity: i64,
}

impl TryFrom<CartItemRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(r: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(r.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid cart quantity {}", r.quantity))
        })?;
        Ok(Self {
            product_id: r.product_id,
            quantity,
        })
    }
}

/// Repository for the `cart_items` table.
pub struct CartRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Lines of a user's cart in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            "SELECT product_id, quantity FROM cart_items WHERE user_id = ? \
             ORDER BY added_at, product_id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails (for example
    /// when the product doesn't exist).
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32, RepositoryError> {
        let quantity = quantity.min(MAX_LINE_QUANTITY);
        let new_quantity: i64 = sqlx::query_scalar(
            "INSERT INTO cart_items (user_id, product_id, quantity, added_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (user_id, product_id) \
             DO UPDATE SET quantity = MIN(cart_items.quantity + excluded.quantity, ?) \
             RETURNING quantity",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(i64::from(quantity))
        .bind(Utc::now())
        .bind(i64::from(MAX_LINE_QUANTITY))
        .fetch_one(self.pool)
        .await?;

        u32::try_from(new_quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid cart quantity {new_quantity}"))
        })
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn set(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        if quantity == 0 {
            return self.remove(user_id, product_id).await;
        }

        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity, added_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = excluded.quantity",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(i64::from(quantity.min(MAX_LINE_QUANTITY)))
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ? AND product_id = ?")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Empty a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Merge guest lines into a user's cart in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any upsert fails; nothing is
    /// merged in that case.
    pub async fn merge(&self, user_id: UserId, lines: &[CartLine]) -> Result<(), RepositoryError> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        for line in lines {
            sqlx::query(
                "INSERT INTO cart_items (user_id, product_id, quantity, added_at) \
                 SELECT ?, id, ?, ? FROM products WHERE id = ? \
                 ON CONFLICT (user_id, product_id) \
                 DO UPDATE SET quantity = MIN(cart_items.quantity + excluded.quantity, ?)",
            )
            .bind(user_id)
            .bind(i64::from(line.quantity.min(MAX_LINE_QUANTITY)))
            .bind(now)
            .bind(line.product_id)
            .bind(i64::from(MAX_LINE_QUANTITY))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
