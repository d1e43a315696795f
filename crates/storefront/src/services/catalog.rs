//! Product catalog: listing, search, categories and suggestions.
//!
//! The set of active products is cached with `moka` (1-minute TTL) and
//! filtered in memory. Anything that changes a product (vendor edits,
//! payment stock decrements) calls [`Catalog::invalidate`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::{ProductRepository, RepositoryError};
use crate::models::Product;

/// Category value meaning "no filter".
pub const ALL_CATEGORIES: &str = "All";

/// Maximum number of search suggestions returned.
pub const MAX_SUGGESTIONS: usize = 8;

const ACTIVE_PRODUCTS_KEY: &str = "active_products";

/// Listing filters from the query string.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Case-insensitive text matched against titles and descriptions.
    pub search: Option<String>,
    /// Category name; `None`, empty or [`ALL_CATEGORIES`] disables filtering.
    pub category: Option<String>,
}

/// One entry of the `/search_suggestions` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub id: i64,
    pub title: String,
    pub url: String,
}

/// Cached catalog reads.
#[derive(Clone)]
pub struct Catalog {
    cache: Cache<&'static str, Arc<Vec<Product>>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(60))
            .build();
        Self { cache }
    }

    /// All active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    pub async fn active_products(
        &self,
        pool: &SqlitePool,
    ) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.cache.get(ACTIVE_PRODUCTS_KEY).await {
            debug!("Cache hit for active products");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(pool).list_active().await?);
        self.cache
            .insert(ACTIVE_PRODUCTS_KEY, Arc::clone(&products))
            .await;
        Ok(products)
    }

    /// Active products matching the query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    pub async fn search(
        &self,
        pool: &SqlitePool,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.active_products(pool).await?;
        Ok(filter_products(&products, query))
    }

    /// `All` followed by the sorted, distinct categories of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    pub async fn categories(&self, pool: &SqlitePool) -> Result<Vec<String>, RepositoryError> {
        let products = self.active_products(pool).await?;
        Ok(categories_of(&products))
    }

    /// Up to [`MAX_SUGGESTIONS`] title matches for a partial query.
    ///
    /// Titles starting with the query come before titles merely containing
    /// it. An empty query yields no suggestions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    pub async fn suggestions(
        &self,
        pool: &SqlitePool,
        query: &str,
        locale: &str,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let products = self.active_products(pool).await?;
        Ok(suggest(&products, &needle, locale))
    }

    /// Drop cached products after a write.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

fn is_all(category: Option<&str>) -> bool {
    category.is_none_or(|c| c.trim().is_empty() || c.trim().eq_ignore_ascii_case(ALL_CATEGORIES))
}

fn filter_products(products: &[Product], query: &ProductQuery) -> Vec<Product> {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let category = query.category.as_deref();
    let all = is_all(category);

    products
        .iter()
        .filter(|p| all || category.is_some_and(|c| p.category.eq_ignore_ascii_case(c.trim())))
        .filter(|p| {
            needle.as_deref().is_none_or(|n| {
                p.title.contains_lowercase(n) || p.description.contains_lowercase(n)
            })
        })
        .cloned()
        .collect()
}

fn categories_of(products: &[Product]) -> Vec<String> {
    let mut categories: Vec<String> = products
        .iter()
        .map(|p| p.category.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    categories.sort_unstable_by_key(|c| c.to_lowercase());
    categories.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    categories.insert(0, ALL_CATEGORIES.to_string());
    categories
}

fn suggest(products: &[Product], needle: &str, locale: &str) -> Vec<Suggestion> {
    let mut matches: Vec<(bool, &Product)> = products
        .iter()
        .filter_map(|p| {
            let title = p.title.get(locale).to_lowercase();
            if title.starts_with(needle) {
                Some((true, p))
            } else if p.title.contains_lowercase(needle) {
                Some((false, p))
            } else {
                None
            }
        })
        .collect();
    // Stable sort keeps newest-first order within each group.
    matches.sort_by_key(|(prefix, _)| !*prefix);

    matches
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, p)| Suggestion {
            id: p.id.as_i64(),
            title: p.title.get(locale).to_string(),
            url: p.url(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use handicrafts_core::{CurrencyCode, LocalizedText, Money, ProductId, VendorId};

    use super::*;
    use crate::db::test_support::{approved_vendor, draft, pool, product};

    fn sample(id: i64, title: &str, description: &str, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            vendor_id: VendorId::new(1),
            title: LocalizedText::new(title),
            description: LocalizedText::new(description),
            category: category.to_string(),
            price: Money::new(10_000, CurrencyCode::Inr),
            stock: 1,
            images: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn products() -> Vec<Product> {
        vec![
            sample(1, "Handmade Bamboo Basket", "Woven by hand", "Baskets"),
            sample(2, "Terracotta Vase", "Fired clay", "Pottery"),
            sample(3, "Clay Lamp", "Diya made of terracotta", "pottery"),
        ]
    }

    #[test]
    fn test_search_matches_title_and_description_case_insensitively() {
        let query = ProductQuery {
            search: Some("TERRACOTTA".to_string()),
            category: None,
        };
        let ids: Vec<i64> = filter_products(&products(), &query)
            .iter()
            .map(|p| p.id.as_i64())
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_category_all_means_no_filter() {
        let all = ProductQuery {
            search: None,
            category: Some("All".to_string()),
        };
        assert_eq!(filter_products(&products(), &all).len(), 3);

        let pottery = ProductQuery {
            search: Some("lamp".to_string()),
            category: Some("Pottery".to_string()),
        };
        let found = filter_products(&products(), &pottery);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_i64(), 3);
    }

    #[test]
    fn test_categories_sorted_distinct_with_all_first() {
        assert_eq!(categories_of(&products()), vec!["All", "Baskets", "Pottery"]);
    }

    #[test]
    fn test_suggestions_rank_prefix_matches_first_and_cap() {
        let found = suggest(&products(), "clay", "en");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "/products/3");

        let many: Vec<Product> = (1..=12)
            .map(|i| sample(i, &format!("Vase {i}"), "", "Pottery"))
            .collect();
        assert_eq!(suggest(&many, "vase", "en").len(), MAX_SUGGESTIONS);

        let mixed = vec![
            sample(1, "Painted Vase", "", "Pottery"),
            sample(2, "Vase Stand", "", "Pottery"),
        ];
        let ranked = suggest(&mixed, "vase", "en");
        assert_eq!(ranked[0].id, 2);
        assert_eq!(ranked[1].id, 1);
    }

    #[tokio::test]
    async fn test_cache_invalidation_picks_up_new_products() {
        let pool = pool().await;
        let vendor = approved_vendor(&pool, "maker@example.com").await;
        let catalog = Catalog::new();

        product(&pool, vendor.id, "Bamboo Basket", 29_900, 3).await;
        assert_eq!(catalog.active_products(&pool).await.unwrap().len(), 1);

        ProductRepository::new(&pool)
            .create(vendor.id, &draft("Terracotta Vase", 59_900, 2))
            .await
            .unwrap();
        assert_eq!(catalog.active_products(&pool).await.unwrap().len(), 1);

        catalog.invalidate().await;
        assert_eq!(catalog.active_products(&pool).await.unwrap().len(), 2);
        assert!(catalog.suggestions(&pool, "  ", "en").await.unwrap().is_empty());
    }
}
