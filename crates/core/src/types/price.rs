//! Prices using decimal arithmetic.
//!
//! Amounts are stored in the currency's standard unit (rupees, dollars) and
//! converted to minor units (paise, cents) only at the payment boundary.
//! Every price shown to a customer goes through [`Price::display`], which
//! always renders exactly two decimals.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price from minor units (paise, cents).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency_code)
    }

    /// Amount in minor units, as the payment widget expects it.
    ///
    /// Fractions of a minor unit round to the nearest unit, ties to even.
    /// Returns `None` only if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED).round().to_i64()
    }

    /// Format for display, e.g. `₹250.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format_amount(self.amount, self.currency_code)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Format a bare amount with the currency symbol and two decimals.
#[must_use]
pub fn format_amount(amount: Decimal, currency_code: CurrencyCode) -> String {
    format!("{}{:.2}", currency_code.symbol(), amount.round_dp(2))
}

/// ISO 4217 currency codes accepted by the payment widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_always_has_two_decimals() {
        assert_eq!(Price::new(Decimal::from(250), CurrencyCode::INR).display(), "₹250.00");
        assert_eq!(Price::new(Decimal::new(1999, 2), CurrencyCode::USD).display(), "$19.99");
        assert_eq!(Price::new(Decimal::new(5, 1), CurrencyCode::GBP).display(), "£0.50");
    }

    #[test]
    fn test_display_rounds_extra_precision() {
        let price = Price::new(Decimal::new(10_004, 3), CurrencyCode::INR);
        assert_eq!(price.display(), "₹10.00");
    }

    #[test]
    fn test_minor_units() {
        let price = Price::new(Decimal::new(24_950, 2), CurrencyCode::INR);
        assert_eq!(price.to_minor_units(), Some(24_950));
        assert_eq!(
            Price::from_minor_units(24_950, CurrencyCode::INR).amount,
            Decimal::new(24_950, 2)
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("inr".parse::<CurrencyCode>(), Ok(CurrencyCode::INR));
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
