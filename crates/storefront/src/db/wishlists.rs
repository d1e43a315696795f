//! Wishlist repository.

use chrono::Utc;
use sqlx::SqlitePool;

use handicrafts_core::{ProductId, UserId};

use super::RepositoryError;

/// Repository for the `wishlist_items` table.
pub struct WishlistRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Product IDs on a user's wishlist, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let ids = sqlx::query_scalar(
            "SELECT product_id FROM wishlist_items WHERE user_id = ? \
             ORDER BY added_at DESC, product_id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }

    /// Save a product. Adding it twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO wishlist_items (user_id, product_id, added_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM wishlist_items WHERE user_id = ? AND product_id = ?")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::{approved_vendor, pool, product, user};

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let pool = pool().await;
        let buyer = user(&pool, "buyer@example.com").await;
        let vendor = approved_vendor(&pool, "maker@example.com").await;
        let vase = product(&pool, vendor.id, "Vase", 59_900, 1).await;
        let repo = WishlistRepository::new(&pool);

        repo.add(buyer.id, vase.id).await.unwrap();
        repo.add(buyer.id, vase.id).await.unwrap();
        assert_eq!(repo.list(buyer.id).await.unwrap(), vec![vase.id]);

        repo.remove(buyer.id, vase.id).await.unwrap();
        assert!(repo.list(buyer.id).await.unwrap().is_empty());
    }
}
