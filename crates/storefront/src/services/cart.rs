//! Cart operations for guests and signed-in users.
//!
//! Guests keep a [`SessionCart`] in their session; signed-in users keep
//! lines in `cart_items`. [`CartOwner`] picks the store so handlers don't
//! branch on it. At login the guest cart is merged into the saved one.

use std::collections::HashMap;

use sqlx::SqlitePool;
use thiserror::Error;
use tower_sessions::Session;

use handicrafts_core::{Money, MoneyError, ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{CartLine, CurrentUser, Product, SessionCart, session_keys};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product doesn't exist.
    #[error("product not found")]
    ProductNotFound,

    /// The product is inactive or sold out.
    #[error("product is not available")]
    ProductUnavailable,

    /// Reading or writing the session failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Line totals overflowed.
    #[error("money error: {0}")]
    Money(#[from] MoneyError),
}

/// Where a cart lives.
#[derive(Clone, Copy)]
pub enum CartOwner<'s> {
    /// Anonymous visitor, cart stored in the session.
    Guest(&'s Session),
    /// Signed-in user, cart stored in the database.
    User(UserId),
}

impl<'s> CartOwner<'s> {
    /// The database cart for signed-in users, the session cart otherwise.
    #[must_use]
    pub fn new(user: Option<&CurrentUser>, session: &'s Session) -> Self {
        match user {
            Some(user) => Self::User(user.id),
            None => Self::Guest(session),
        }
    }
}

/// A cart line joined with its product.
#[derive(Debug, Clone)]
pub struct CartEntry {
    pub product: Product,
    pub quantity: u32,
    pub line_total: Money,
}

impl CartEntry {
    /// Whether the line can be bought as it stands.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.product.can_fulfil(self.quantity)
    }
}

/// Priced view of a cart.
#[derive(Debug, Clone, Default)]
pub struct CartSummary {
    pub entries: Vec<CartEntry>,
    /// `None` when the cart is empty or mixes currencies.
    pub total: Option<Money>,
    pub item_count: u32,
}

impl CartSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when lines are priced in more than one currency.
    #[must_use]
    pub fn has_mixed_currencies(&self) -> bool {
        !self.entries.is_empty() && self.total.is_none()
    }
}

/// Cart service.
pub struct CartService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Raw lines of a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the session or database cannot be read.
    pub async fn lines(&self, owner: CartOwner<'_>) -> Result<Vec<CartLine>, CartError> {
        match owner {
            CartOwner::Guest(session) => Ok(load_session_cart(session).await?.lines().to_vec()),
            CartOwner::User(user_id) => Ok(CartRepository::new(self.pool).list(user_id).await?),
        }
    }

    /// Add units of an available product, merging with an existing line.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` or `CartError::ProductUnavailable`
    /// if the product cannot be bought.
    #[tracing::instrument(skip(self, owner))]
    pub async fn add(
        &self,
        owner: CartOwner<'_>,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32, CartError> {
        self.purchasable(product_id).await?;

        let quantity = quantity.max(1);
        match owner {
            CartOwner::Guest(session) => {
                let mut cart = load_session_cart(session).await?;
                let new_quantity = cart.add(product_id, quantity);
                session.insert(session_keys::CART, &cart).await?;
                Ok(new_quantity)
            }
            CartOwner::User(user_id) => Ok(CartRepository::new(self.pool)
                .add(user_id, product_id, quantity)
                .await?),
        }
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// A non-zero quantity fails like [`add`](Self::add) when the product
    /// cannot be bought. Otherwise returns `CartError` if the session or
    /// database write fails.
    #[tracing::instrument(skip(self, owner))]
    pub async fn set(
        &self,
        owner: CartOwner<'_>,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity > 0 {
            self.purchasable(product_id).await?;
        }

        match owner {
            CartOwner::Guest(session) => {
                let mut cart = load_session_cart(session).await?;
                cart.set(product_id, quantity);
                session.insert(session_keys::CART, &cart).await?;
            }
            CartOwner::User(user_id) => {
                CartRepository::new(self.pool)
                    .set(user_id, product_id, quantity)
                    .await?;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CartError` if the session or database write fails.
    pub async fn remove(&self, owner: CartOwner<'_>, product_id: ProductId) -> Result<(), CartError> {
        self.set(owner, product_id, 0).await
    }

    async fn purchasable(&self, product_id: ProductId) -> Result<Product, CartError> {
        let product = ProductRepository::new(self.pool)
            .get_by_id(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        if !product.is_active || product.stock <= 0 {
            return Err(CartError::ProductUnavailable);
        }
        Ok(product)
    }

    /// Join lines with products and compute the total.
    ///
    /// Lines whose product has been deleted are dropped.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Money` if a line total overflows.
    pub async fn summary(&self, owner: CartOwner<'_>) -> Result<CartSummary, CartError> {
        let lines = self.lines(owner).await?;
        if lines.is_empty() {
            return Ok(CartSummary::default());
        }

        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let mut products: HashMap<ProductId, Product> = ProductRepository::new(self.pool)
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            let Some(product) = products.remove(&line.product_id) else {
                tracing::debug!(product_id = %line.product_id, "Dropping cart line for missing product");
                continue;
            };
            let line_total = product.price.checked_mul(line.quantity)?;
            entries.push(CartEntry {
                product,
                quantity: line.quantity,
                line_total,
            });
        }

        let total = cart_total(&entries)?;
        let item_count = entries.iter().map(|e| e.quantity).sum();
        Ok(CartSummary {
            entries,
            total,
            item_count,
        })
    }

    /// Move the guest cart into the user's saved cart, then clear it.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the session or database cannot be accessed.
    #[tracing::instrument(skip(self, session))]
    pub async fn merge_session_into_user(
        &self,
        session: &Session,
        user_id: UserId,
    ) -> Result<(), CartError> {
        let mut cart = load_session_cart(session).await?;
        if cart.is_empty() {
            return Ok(());
        }

        let lines = cart.drain();
        CartRepository::new(self.pool).merge(user_id, &lines).await?;
        session.remove::<SessionCart>(session_keys::CART).await?;
        tracing::info!(lines = lines.len(), "Merged guest cart");
        Ok(())
    }
}

async fn load_session_cart(session: &Session) -> Result<SessionCart, CartError> {
    Ok(session
        .get::<SessionCart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Sum line totals; `None` for an empty or mixed-currency cart.
fn cart_total(entries: &[CartEntry]) -> Result<Option<Money>, MoneyError> {
    let Some(first) = entries.first() else {
        return Ok(None);
    };
    let mut total = Money::zero(first.line_total.currency);
    for entry in entries {
        total = match total.checked_add(entry.line_total) {
            Ok(sum) => sum,
            Err(MoneyError::CurrencyMismatch { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
    }
    Ok(Some(total))
}
