//! Cart domain types.
//!
//! Guests keep their cart in the session as a [`SessionCart`]; signed-in
//! users keep it in the `cart_items` table. Both hold at most one line per
//! product: adding a product already in the cart raises its quantity.

use serde::{Deserialize, Serialize};

use handicrafts_core::ProductId;

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// One product in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A guest cart stored in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCart {
    lines: Vec<CartLine>,
}

impl SessionCart {
    /// Lines in the order they were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Add `quantity` units, merging with an existing line for the product.
    ///
    /// Returns the line's new quantity, capped at [`MAX_LINE_QUANTITY`].
    pub fn add(&mut self, product_id: ProductId, quantity: u32) -> u32 {
        if quantity == 0 {
            return self.quantity_of(product_id);
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            return line.quantity;
        }
        let quantity = quantity.min(MAX_LINE_QUANTITY);
        self.lines.push(CartLine {
            product_id,
            quantity,
        });
        quantity
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn set(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        let quantity = quantity.min(MAX_LINE_QUANTITY);
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Remove a product's line if present.
    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Current quantity of a product, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Take all lines, leaving the cart empty.
    pub fn drain(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines)
    }
}

impl FromIterator<CartLine> for SessionCart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        let mut cart = Self::default();
        for line in iter {
            cart.add(line.product_id, line.quantity);
        }
        cart
    }
}
