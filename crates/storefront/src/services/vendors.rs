//! Vendor applications, admin review and product listings.

use sqlx::SqlitePool;
use thiserror::Error;

use handicrafts_core::{
    CurrencyCode, DEFAULT_LOCALE, LocalizedText, Money, MoneyError, ProductId, UserId, VendorId,
    VendorStatus,
};

use crate::db::{ProductRepository, RepositoryError, VendorRepository};
use crate::models::{Product, ProductDraft, Vendor};
use crate::services::catalog::Catalog;

const MAX_NAME_LENGTH: usize = 120;
const MAX_TITLE_LENGTH: usize = 200;

/// Errors from vendor operations.
#[derive(Debug, Error)]
pub enum VendorError {
    /// The user already has a vendor account.
    #[error("you have already applied to sell")]
    AlreadyApplied,

    /// The user has no vendor account.
    #[error("not a vendor")]
    NotAVendor,

    /// The vendor is pending or rejected.
    #[error("vendor is not approved")]
    NotApproved,

    /// Vendor or product not found (or not owned by this vendor).
    #[error("not found")]
    NotFound,

    /// The admin decision is not allowed from the current status.
    #[error("cannot change vendor from {from} to {to}")]
    InvalidTransition { from: VendorStatus, to: VendorStatus },

    /// Form input failed validation.
    #[error("{0}")]
    Invalid(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<MoneyError> for VendorError {
    fn from(err: MoneyError) -> Self {
        Self::Invalid(format!("Price: {err}"))
    }
}

/// Seller application form.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct VendorApplication {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payout_info: String,
}

/// Product form fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Major units, e.g. `"299"` or `"599.50"`.
    pub price: String,
    pub stock: String,
    pub is_active: bool,
}

impl ProductInput {
    /// Prefill from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.default_text().to_string(),
            description: product.description.default_text().to_string(),
            category: product.category.clone(),
            price: product.price.to_major_string(),
            stock: product.stock.to_string(),
            is_active: product.is_active,
        }
    }

    /// Validate into a draft.
    ///
    /// When editing, translations other than the default locale and the
    /// existing images are kept; `new_images` are appended.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::Invalid` with a user-facing message.
    pub fn into_draft(
        self,
        currency: CurrencyCode,
        existing: Option<&Product>,
        new_images: Vec<String>,
    ) -> Result<ProductDraft, VendorError> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
            return Err(VendorError::Invalid("Title is required".to_string()));
        }
        let category = self.category.trim();
        if category.is_empty() {
            return Err(VendorError::Invalid("Category is required".to_string()));
        }
        let price = Money::parse_major(&self.price, currency)?;
        let stock: i64 = self
            .stock
            .trim()
            .parse()
            .ok()
            .filter(|s| *s >= 0)
            .ok_or_else(|| VendorError::Invalid("Stock must be a whole number, 0 or more".to_string()))?;

        let (base_title, base_description, mut images) = match existing {
            Some(p) => (p.title.clone(), p.description.clone(), p.images.clone()),
            None => (LocalizedText::default(), LocalizedText::default(), Vec::new()),
        };
        images.extend(new_images);

        Ok(ProductDraft {
            title: base_title.with(DEFAULT_LOCALE, title),
            description: base_description.with(DEFAULT_LOCALE, self.description),
            category: category.to_string(),
            price,
            stock,
            images,
            is_active: self.is_active,
        })
    }
}

/// Vendor service.
pub struct VendorService<'a> {
    pool: &'a SqlitePool,
    catalog: &'a Catalog,
}

impl<'a> VendorService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, catalog: &'a Catalog) -> Self {
        Self { pool, catalog }
    }

    /// The user's vendor account, if any.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::Repository` if the lookup fails.
    pub async fn for_owner(&self, owner_id: UserId) -> Result<Option<Vendor>, VendorError> {
        Ok(VendorRepository::new(self.pool).get_by_owner(owner_id).await?)
    }

    /// Submit a seller application. The vendor starts out `PENDING`.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::AlreadyApplied` if the user already has a vendor,
    /// or `VendorError::Invalid` if the name is missing.
    #[tracing::instrument(skip(self, application), fields(owner_id = %owner_id))]
    pub async fn apply(
        &self,
        owner_id: UserId,
        application: &VendorApplication,
    ) -> Result<Vendor, VendorError> {
        let name = application.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(VendorError::Invalid("Shop name is required".to_string()));
        }

        let vendor = VendorRepository::new(self.pool)
            .create(
                owner_id,
                name,
                application.description.trim(),
                application.payout_info.trim(),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => VendorError::AlreadyApplied,
                other => VendorError::Repository(other),
            })?;

        tracing::info!(vendor_id = %vendor.id, "Vendor application submitted");
        Ok(vendor)
    }

    /// Admin decision on a vendor.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotFound` or `VendorError::InvalidTransition`.
    #[tracing::instrument(skip(self))]
    pub async fn decide(&self, vendor_id: VendorId, to: VendorStatus) -> Result<Vendor, VendorError> {
        let repo = VendorRepository::new(self.pool);
        let vendor = repo.get_by_id(vendor_id).await?.ok_or(VendorError::NotFound)?;
        if !vendor.status.can_transition_to(to) {
            return Err(VendorError::InvalidTransition {
                from: vendor.status,
                to,
            });
        }

        let vendor = repo.set_status(vendor_id, to).await?;
        // Products of a rejected vendor drop out of the public listing.
        self.catalog.invalidate().await;
        tracing::info!(status = %vendor.status, "Vendor status changed");
        Ok(vendor)
    }

    /// The user's vendor, which must be approved to sell.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotAVendor` or `VendorError::NotApproved`.
    pub async fn require_seller(&self, owner_id: UserId) -> Result<Vendor, VendorError> {
        let vendor = self.for_owner(owner_id).await?.ok_or(VendorError::NotAVendor)?;
        if !vendor.status.can_sell() {
            return Err(VendorError::NotApproved);
        }
        Ok(vendor)
    }

    /// A product owned by `vendor`.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotFound` if the product doesn't exist or
    /// belongs to another vendor.
    pub async fn owned_product(
        &self,
        vendor: &Vendor,
        product_id: ProductId,
    ) -> Result<Product, VendorError> {
        ProductRepository::new(self.pool)
            .get_by_id(product_id)
            .await?
            .filter(|p| p.vendor_id == vendor.id)
            .ok_or(VendorError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `VendorError::NotApproved` unless the vendor is approved.
    #[tracing::instrument(skip(self, vendor, draft), fields(vendor_id = %vendor.id))]
    pub async fn create_product(
        &self,
        vendor: &Vendor,
        draft: &ProductDraft,
    ) -> Result<Product, VendorError> {
        if !vendor.status.can_sell() {
            return Err(VendorError::NotApproved);
        }
        let product = ProductRepository::new(self.pool)
            .create(vendor.id, draft)
            .await?;
        self.catalog.invalidate().await;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `VendorError::NotApproved` unless the vendor is approved, or
    /// `VendorError::NotFound` if the product isn't theirs.
    #[tracing::instrument(skip(self, vendor, draft), fields(vendor_id = %vendor.id))]
    pub async fn update_product(
        &self,
        vendor: &Vendor,
        product_id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, VendorError> {
        if !vendor.status.can_sell() {
            return Err(VendorError::NotApproved);
        }
        let product = ProductRepository::new(self.pool)
            .update(product_id, vendor.id, draft)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => VendorError::NotFound,
                other => VendorError::Repository(other),
            })?;
        self.catalog.invalidate().await;
        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::{approved_vendor, pool, user};

    fn input(price: &str, stock: &str) -> ProductInput {
        ProductInput {
            title: "Bamboo Basket".to_string(),
            description: "Woven by hand".to_string(),
            category: "Baskets".to_string(),
            price: price.to_string(),
            stock: stock.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_product_input_validation() {
        let draft = input("299", "4")
            .into_draft(CurrencyCode::Inr, None, vec!["/uploads/a.png".to_string()])
            .unwrap();
        assert_eq!(draft.price.amount_minor, 29_900);
        assert_eq!(draft.stock, 4);
        assert_eq!(draft.images, vec!["/uploads/a.png"]);

        assert!(matches!(
            input("-1", "4").into_draft(CurrencyCode::Inr, None, vec![]),
            Err(VendorError::Invalid(_))
        ));
        assert!(matches!(
            input("299", "-2").into_draft(CurrencyCode::Inr, None, vec![]),
            Err(VendorError::Invalid(_))
        ));
        let mut untitled = input("299", "1");
        untitled.title = "  ".to_string();
        assert!(matches!(
            untitled.into_draft(CurrencyCode::Inr, None, vec![]),
            Err(VendorError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_once_then_admin_approves() {
        let pool = pool().await;
        let catalog = Catalog::new();
        let vendors = VendorService::new(&pool, &catalog);
        let owner = user(&pool, "weaver@example.com").await;
        let application = VendorApplication {
            name: "Weaver's Loom".to_string(),
            description: "Handwoven textiles".to_string(),
            payout_info: "UPI weaver@upi".to_string(),
        };

        let vendor = vendors.apply(owner.id, &application).await.unwrap();
        assert_eq!(vendor.status, VendorStatus::Pending);
        assert!(matches!(
            vendors.apply(owner.id, &application).await,
            Err(VendorError::AlreadyApplied)
        ));
        assert!(matches!(
            vendors.require_seller(owner.id).await,
            Err(VendorError::NotApproved)
        ));

        let approved = vendors.decide(vendor.id, VendorStatus::Approved).await.unwrap();
        assert_eq!(approved.status, VendorStatus::Approved);
        assert!(vendors.require_seller(owner.id).await.is_ok());

        assert!(matches!(
            vendors.decide(vendor.id, VendorStatus::Pending).await,
            Err(VendorError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_vendor_cannot_edit_another_vendors_product() {
        let pool = pool().await;
        let catalog = Catalog::new();
        let vendors = VendorService::new(&pool, &catalog);
        let first = approved_vendor(&pool, "first@example.com").await;
        let second = approved_vendor(&pool, "second@example.com").await;

        let draft = input("299", "3")
            .into_draft(CurrencyCode::Inr, None, vec![])
            .unwrap();
        let product = vendors.create_product(&first, &draft).await.unwrap();

        assert!(matches!(
            vendors.update_product(&second, product.id, &draft).await,
            Err(VendorError::NotFound)
        ));
        assert!(matches!(
            vendors.owned_product(&second, product.id).await,
            Err(VendorError::NotFound)
        ));
    }
}
