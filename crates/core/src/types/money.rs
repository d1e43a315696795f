//! Money amounts in minor currency units.
//!
//! Prices, order totals and payouts are stored as integer minor units
//! (paise, cents) together with an ISO 4217 currency code. Decimal
//! arithmetic is only used at the edges: parsing seller input and
//! formatting for display.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Share of an order total paid out to the vendor, in percent.
pub const VENDOR_PAYOUT_PERCENT: i64 = 90;

/// Errors produced by money arithmetic and parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Two amounts in different currencies were combined.
    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        /// Currency of the left-hand amount.
        expected: CurrencyCode,
        /// Currency of the right-hand amount.
        found: CurrencyCode,
    },
    /// The result does not fit in an `i64` of minor units.
    #[error("amount overflow")]
    Overflow,
    /// The input could not be parsed as a decimal amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Negative amounts are not accepted for prices.
    #[error("amount cannot be negative")]
    Negative,
    /// Unknown ISO 4217 code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// ISO 4217 currency codes accepted by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    Inr,
    Usd,
    Eur,
    Gbp,
}

impl CurrencyCode {
    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Inr => "₹",
            Self::Usd => "$",
            Self::Eur => "€",
            Self::Gbp => "£",
        }
    }

    /// Number of decimal places between major and minor units.
    #[must_use]
    pub const fn minor_unit_exponent(self) -> u32 {
        2
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::Inr),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            other => Err(MoneyError::UnsupportedCurrency(other.to_owned())),
        }
    }
}

/// An amount of money in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the smallest currency unit (e.g., paise for INR).
    pub amount_minor: i64,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount_minor: i64, currency: CurrencyCode) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(0, currency)
    }

    /// Parse a major-unit decimal string such as `"299"` or `"599.50"`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidAmount` for malformed input or more
    /// decimal places than the currency allows, `MoneyError::Negative` for
    /// negative amounts and `MoneyError::Overflow` when out of range.
    pub fn parse_major(input: &str, currency: CurrencyCode) -> Result<Self, MoneyError> {
        let trimmed = input.trim();
        let value = Decimal::from_str(trimmed)
            .map_err(|_| MoneyError::InvalidAmount(trimmed.to_owned()))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative);
        }

        let exponent = currency.minor_unit_exponent();
        if value.scale() > exponent {
            return Err(MoneyError::InvalidAmount(trimmed.to_owned()));
        }

        let minor = value
            .checked_mul(Decimal::from(10_i64.pow(exponent)))
            .ok_or(MoneyError::Overflow)?;
        let amount_minor = i64::try_from(minor.trunc()).map_err(|_| MoneyError::Overflow)?;

        Ok(Self::new(amount_minor, currency))
    }

    /// Add two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` or `MoneyError::Overflow`.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        let amount_minor = self
            .amount_minor
            .checked_add(other.amount_minor)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount_minor, self.currency))
    }

    /// Multiply by a line quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the product does not fit.
    pub fn checked_mul(self, quantity: u32) -> Result<Self, MoneyError> {
        let amount_minor = self
            .amount_minor
            .checked_mul(i64::from(quantity))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount_minor, self.currency))
    }

    /// The vendor's share of this order total, rounded down to a whole
    /// minor unit.
    #[must_use]
    pub const fn vendor_payout(self) -> Self {
        // i128 keeps the intermediate product from overflowing.
        #[allow(clippy::cast_possible_truncation)]
        let amount_minor =
            (self.amount_minor as i128 * VENDOR_PAYOUT_PERCENT as i128 / 100) as i64;
        Self::new(amount_minor, self.currency)
    }

    /// Amount in major units as a decimal.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.amount_minor, self.currency.minor_unit_exponent())
    }

    /// Format for display (e.g., "₹299.00").
    #[must_use]
    pub fn display(self) -> String {
        format!("{}{:.2}", self.currency.symbol(), self.to_decimal())
    }

    /// Format as a plain major-unit string for form inputs (e.g., "299.00").
    #[must_use]
    pub fn to_major_string(self) -> String {
        format!("{:.2}", self.to_decimal())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::new(29_900, CurrencyCode::Inr).display(), "₹299.00");
        assert_eq!(Money::new(1_999, CurrencyCode::Usd).display(), "$19.99");
        assert_eq!(Money::zero(CurrencyCode::Eur).display(), "€0.00");
    }

    #[test]
    fn test_parse_major() {
        let inr = CurrencyCode::Inr;
        assert_eq!(Money::parse_major("299", inr).unwrap().amount_minor, 29_900);
        assert_eq!(Money::parse_major(" 599.5 ", inr).unwrap().amount_minor, 59_950);
        assert_eq!(Money::parse_major("0.01", inr).unwrap().amount_minor, 1);
        assert!(matches!(
            Money::parse_major("1.999", inr),
            Err(MoneyError::InvalidAmount(_))
        ));
        assert!(matches!(
            Money::parse_major("-5", inr),
            Err(MoneyError::Negative)
        ));
        assert!(matches!(
            Money::parse_major("abc", inr),
            Err(MoneyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_checked_add_rejects_mixed_currencies() {
        let a = Money::new(100, CurrencyCode::Inr);
        let b = Money::new(100, CurrencyCode::Usd);
        assert!(matches!(
            a.checked_add(b),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
        assert_eq!(a.checked_add(a).unwrap().amount_minor, 200);
    }

    #[test]
    fn test_checked_mul_overflow() {
        let big = Money::new(i64::MAX / 2, CurrencyCode::Inr);
        assert!(matches!(big.checked_mul(3), Err(MoneyError::Overflow)));
        assert_eq!(
            Money::new(29_900, CurrencyCode::Inr)
                .checked_mul(2)
                .unwrap()
                .amount_minor,
            59_800
        );
    }

    #[test]
    fn test_vendor_payout_is_ninety_percent_rounded_down() {
        let total = Money::new(89_800, CurrencyCode::Inr);
        assert_eq!(total.vendor_payout().amount_minor, 80_820);

        let odd = Money::new(1_005, CurrencyCode::Inr);
        assert_eq!(odd.vendor_payout().amount_minor, 904);

        let huge = Money::new(i64::MAX, CurrencyCode::Inr);
        assert!(huge.vendor_payout().amount_minor > 0);
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::Inr);
        assert_eq!("GBP".parse::<CurrencyCode>().unwrap(), CurrencyCode::Gbp);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_currency_serde() {
        let json = serde_json::to_string(&CurrencyCode::Inr).unwrap();
        assert_eq!(json, "\"INR\"");
    }
}
