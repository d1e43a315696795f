//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use handicrafts_core::{CurrencyCode, Money, OrderId, OrderStatus, ProductId, UserId, VendorId};

/// An order for the products of one vendor.
///
/// A checkout that spans several vendors produces one order per vendor,
/// all sharing the same payment session.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub vendor_id: VendorId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    /// Payment provider checkout session, set once the session exists.
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Snapshot of a purchased line, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub quantity: u32,
    pub unit_price_minor: i64,
}

impl OrderItem {
    /// Price of the line in the order's currency.
    ///
    /// Saturates instead of overflowing; totals are computed with checked
    /// arithmetic before an order is ever stored.
    #[must_use]
    pub fn line_total(&self, currency: CurrencyCode) -> Money {
        Money::new(
            self.unit_price_minor
                .saturating_mul(i64::from(self.quantity)),
            currency,
        )
    }
}

/// A required address field was left blank.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{0} is required")]
pub struct MissingField(pub &'static str);

/// Delivery address captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

impl ShippingAddress {
    /// Trim every field and check that the required ones are present.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` naming the first blank required field.
    pub fn normalized(self) -> Result<Self, MissingField> {
        let address = Self {
            full_name: self.full_name.trim().to_string(),
            line1: self.line1.trim().to_string(),
            line2: self.line2.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            phone: self.phone.trim().to_string(),
        };

        for (value, name) in [
            (&address.full_name, "Full name"),
            (&address.line1, "Address"),
            (&address.city, "City"),
            (&address.postal_code, "Postal code"),
            (&address.country, "Country"),
        ] {
            if value.is_empty() {
                return Err(MissingField(name));
            }
        }

        Ok(address)
    }

    /// Single-line rendering for order lists.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.line1.as_str(),
            self.line2.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: " Asha Rao ".to_string(),
            line1: "12 Temple Road".to_string(),
            line2: String::new(),
            city: "Mysuru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "570001".to_string(),
            country: "India".to_string(),
            phone: String::new(),
        }
    }

    #[test]
    fn test_normalized_trims() {
        let addr = address().normalized().unwrap();
        assert_eq!(addr.full_name, "Asha Rao");
        assert_eq!(addr.one_line(), "12 Temple Road, Mysuru, Karnataka, 570001, India");
    }

    #[test]
    fn test_normalized_rejects_blank_required_field() {
        let mut addr = address();
        addr.city = "   ".to_string();
        assert_eq!(addr.normalized().unwrap_err(), MissingField("City"));
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem {
            product_id: ProductId::new(1),
            title: "Terracotta Vase".to_string(),
            quantity: 2,
            unit_price_minor: 59_900,
        };
        assert_eq!(item.line_total(CurrencyCode::Inr).amount_minor, 119_800);
    }
}
