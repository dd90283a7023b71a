//! Cart line arithmetic and order totals.
//!
//! Cart rows live in the document store; this module only decides what a
//! quantity change turns a row into and what a set of lines costs.

use rust_decimal::Decimal;

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Result of applying a quantity change to a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    /// Store the new quantity.
    Set(u32),
    /// Delete the row; the quantity reached zero.
    Remove,
}

/// Decrease a line's quantity by `by`.
///
/// A line never rests at quantity zero: reaching (or passing) zero removes it.
#[must_use]
pub const fn decrement(current: u32, by: u32) -> LineChange {
    match current.saturating_sub(by) {
        0 => LineChange::Remove,
        remaining => LineChange::Set(remaining),
    }
}

/// Increase a line's quantity by `by`, capped at [`MAX_LINE_QUANTITY`].
#[must_use]
pub fn increment(current: u32, by: u32) -> LineChange {
    LineChange::Set(current.saturating_add(by).min(MAX_LINE_QUANTITY))
}

/// Anything with a unit price and a quantity.
pub trait PricedLine {
    /// Unit price in the currency's standard unit.
    fn unit_price(&self) -> Decimal;
    /// Number of units.
    fn quantity(&self) -> u32;

    /// Unit price times quantity.
    fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity())
    }
}

/// Sum of `price × quantity` over all lines.
#[must_use]
pub fn total<L: PricedLine>(lines: &[L]) -> Decimal {
    lines.iter().map(PricedLine::line_total).sum()
}

/// Total number of units across all lines (the cart badge count).
#[must_use]
pub fn item_count<L: PricedLine>(lines: &[L]) -> u32 {
    lines.iter().map(PricedLine::quantity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CurrencyCode, Price};

    struct Line(i64, u32);

    impl PricedLine for Line {
        fn unit_price(&self) -> Decimal {
            Decimal::from(self.0)
        }

        fn quantity(&self) -> u32 {
            self.1
        }
    }

    #[test]
    fn test_decrement_from_one_removes_line() {
        assert_eq!(decrement(1, 1), LineChange::Remove);
    }

    #[test]
    fn test_decrement_past_zero_removes_line() {
        assert_eq!(decrement(2, 5), LineChange::Remove);
    }

    #[test]
    fn test_decrement_keeps_positive_quantity() {
        assert_eq!(decrement(3, 1), LineChange::Set(2));
    }

    #[test]
    fn test_increment_is_capped() {
        assert_eq!(increment(1, 1), LineChange::Set(2));
        assert_eq!(increment(98, 5), LineChange::Set(MAX_LINE_QUANTITY));
    }

    #[test]
    fn test_order_total() {
        let lines = [Line(100, 2), Line(50, 1)];
        let sum = total(&lines);
        assert_eq!(sum, Decimal::from(250));
        assert_eq!(Price::new(sum, CurrencyCode::INR).display(), "₹250.00");
        assert_eq!(item_count(&lines), 3);
    }

    #[test]
    fn test_empty_cart_totals_zero() {
        let lines: [Line; 0] = [];
        assert_eq!(total(&lines), Decimal::ZERO);
        assert_eq!(item_count(&lines), 0);
    }
}
