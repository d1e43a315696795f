//! Product repository.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use handicrafts_core::{CurrencyCode, LocalizedText, Money, ProductId, VendorId, VendorStatus};

use super::RepositoryError;
use crate::models::{Product, ProductDraft};

const PRODUCT_COLUMNS: &str = "id, vendor_id, title, description, category, price_minor, \
                               currency, stock, images, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    vendor_id: VendorId,
    title: LocalizedText,
    description: LocalizedText,
    category: String,
    price_minor: i64,
    currency: CurrencyCode,
    stock: i64,
    images: Json<Vec<String>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            vendor_id: r.vendor_id,
            title: r.title,
            description: r.description,
            category: r.category,
            price: Money::new(r.price_minor, r.currency),
            stock: r.stock,
            images: r.images.0,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a product for a vendor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        vendor_id: VendorId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products (vendor_id, title, description, category, price_minor, currency, \
                                   stock, images, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(vendor_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(draft.price.amount_minor)
        .bind(draft.price.currency)
        .bind(draft.stock)
        .bind(Json(&draft.images))
        .bind(draft.is_active)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a product owned by `vendor_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist or
    /// belongs to another vendor.
    pub async fn update(
        &self,
        id: ProductId,
        vendor_id: VendorId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE products SET title = ?, description = ?, category = ?, price_minor = ?, \
                                 currency = ?, stock = ?, images = ?, is_active = ?, updated_at = ? \
             WHERE id = ? AND vendor_id = ? \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(draft.price.amount_minor)
        .bind(draft.price.currency)
        .bind(draft.stock)
        .bind(Json(&draft.images))
        .bind(draft.is_active)
        .bind(Utc::now())
        .bind(id)
        .bind(vendor_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(Product::from))
    }

    /// Load several products at once. Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<ProductRow> = builder.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Active products of approved vendors, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 \
             AND vendor_id IN (SELECT id FROM vendors WHERE status = ?) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(VendorStatus::Approved)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Every product of a vendor, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE vendor_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::{approved_vendor, draft, pool};

    #[tokio::test]
    async fn test_create_roundtrips_localized_text_and_images() {
        let pool = pool().await;
        let vendor = approved_vendor(&pool, "maker@example.com").await;
        let repo = ProductRepository::new(&pool);

        let mut new = draft("Bamboo Basket", 29_900, 5);
        new.title = new.title.with("hi", "बाँस की टोकरी");
        new.images = vec!["/uploads/basket.png".to_string()];

        let product = repo.create(vendor.id, &new).await.unwrap();
        let loaded = repo.get_by_id(product.id).await.unwrap().unwrap();

        assert_eq!(loaded.title.get("hi"), "बाँस की टोकरी");
        assert_eq!(loaded.title.get("en"), "Bamboo Basket");
        assert_eq!(loaded.images, vec!["/uploads/basket.png".to_string()]);
        assert_eq!(loaded.price.amount_minor, 29_900);
    }

    #[tokio::test]
    async fn test_update_is_scoped_to_vendor() {
        let pool = pool().await;
        let owner = approved_vendor(&pool, "owner@example.com").await;
        let other = approved_vendor(&pool, "other@example.com").await;
        let repo = ProductRepository::new(&pool);
        let product = repo
            .create(owner.id, &draft("Vase", 59_900, 1))
            .await
            .unwrap();

        let err = repo
            .update(product.id, other.id, &draft("Stolen", 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));

        let updated = repo
            .update(product.id, owner.id, &draft("Terracotta Vase", 59_900, 4))
            .await
            .unwrap();
        assert_eq!(updated.title.default_text(), "Terracotta Vase");
        assert_eq!(updated.stock, 4);
    }

    #[tokio::test]
    async fn test_get_many_and_list_active() {
        let pool = pool().await;
        let vendor = approved_vendor(&pool, "maker@example.com").await;
        let repo = ProductRepository::new(&pool);
        let a = repo.create(vendor.id, &draft("A", 100, 1)).await.unwrap();
        let mut hidden = draft("B", 100, 1);
        hidden.is_active = false;
        let b = repo.create(vendor.id, &hidden).await.unwrap();

        let many = repo
            .get_many(&[a.id, b.id, ProductId::new(999)])
            .await
            .unwrap();
        assert_eq!(many.len(), 2);

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);
        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }
}
