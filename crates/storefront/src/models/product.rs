//! Product domain types.

use chrono::{DateTime, Utc};

use handicrafts_core::{LocalizedText, Money, ProductId, VendorId};

/// A listing in the catalog.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub category: String,
    pub price: Money,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Relative upload paths or absolute image URLs.
    pub images: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// First image, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether `quantity` units can be sold right now.
    #[must_use]
    pub fn can_fulfil(&self, quantity: u32) -> bool {
        self.is_active && self.stock >= i64::from(quantity)
    }

    /// Site-relative URL of the detail page.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/products/{}", self.id)
    }
}

/// Validated input for creating or updating a product.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub category: String,
    pub price: Money,
    pub stock: i64,
    pub images: Vec<String>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use handicrafts_core::CurrencyCode;

    use super::*;

    fn product(stock: i64, is_active: bool) -> Product {
        Product {
            id: ProductId::new(1),
            vendor_id: VendorId::new(1),
            title: LocalizedText::new("Bamboo Basket"),
            description: LocalizedText::default(),
            category: "Baskets".to_string(),
            price: Money::new(29_900, CurrencyCode::Inr),
            stock,
            images: Vec::new(),
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_fulfil() {
        assert!(product(3, true).can_fulfil(3));
        assert!(!product(2, true).can_fulfil(3));
        assert!(!product(10, false).can_fulfil(1));
    }

    #[test]
    fn test_url_and_image() {
        let mut p = product(1, true);
        assert_eq!(p.url(), "/products/1");
        assert_eq!(p.primary_image(), None);
        p.images.push("/uploads/a.png".to_string());
        assert_eq!(p.primary_image(), Some("/uploads/a.png"));
    }
}
