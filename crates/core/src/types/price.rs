//! Decimal prices and percentage discounts.
//!
//! The storefront API sends prices as plain JSON numbers in the shop's
//! single currency, so `Price` carries no currency code. Arithmetic stays in
//! `Decimal` to avoid float drift in cart totals, and saturates at the
//! `Decimal` bounds instead of overflowing. Deserialization accepts either a
//! JSON number or a string.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-currency-tagged amount in the shop's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price after a percentage discount, rounded to cents.
    ///
    /// Percentages outside `0..=100` are clamped.
    #[must_use]
    pub fn discounted(&self, percent: Decimal) -> Self {
        let percent = percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        let kept = Decimal::ONE_HUNDRED - percent;
        let amount = self.0.checked_mul(kept).map_or_else(
            || self.0 / Decimal::ONE_HUNDRED * kept,
            |n| n / Decimal::ONE_HUNDRED,
        );
        Self(amount.round_dp(2))
    }

    /// The amount taken off by a percentage discount, rounded to cents.
    #[must_use]
    pub fn discount_amount(&self, percent: Decimal) -> Self {
        Self((self.0 - self.discounted(percent).0).round_dp(2))
    }

    /// Multiply by a quantity, saturating at the largest amount.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl core::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl core::ops::Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| acc + p)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(1999).to_string(), "19.99");
        assert_eq!(Price::from_cents(0), Price::ZERO);
    }

    #[test]
    fn test_discounted() {
        let price = Price::from_cents(10000);
        assert_eq!(price.discounted(Decimal::new(15, 0)), Price::from_cents(8500));
        assert_eq!(price.discount_amount(Decimal::new(15, 0)), Price::from_cents(1500));
    }

    #[test]
    fn test_discount_is_clamped() {
        let price = Price::from_cents(500);
        assert_eq!(price.discounted(Decimal::new(150, 0)), Price::ZERO);
        assert_eq!(price.discounted(Decimal::new(-5, 0)), price);
    }

    #[test]
    fn test_deserializes_from_json_number() {
        let price: Price = serde_json::from_str("9.99").unwrap();
        assert_eq!(price, Price::from_cents(999));
    }

    #[test]
    fn test_sum_and_times() {
        let total: Price = [Price::from_cents(100), Price::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(350));
        assert_eq!(Price::from_cents(250).times(3), Price::from_cents(750));
    }

    #[test]
    fn test_math_saturates() {
        let max = Price::new(Decimal::MAX);
        assert_eq!(max.times(2), max);
        assert_eq!(max + Price::from_cents(1), max);
        assert_eq!(Price::new(Decimal::MIN) - max, Price::new(Decimal::MIN));
        assert_eq!([max, max].into_iter().sum::<Price>(), max);
    }

    #[test]
    fn test_discount_on_huge_amount() {
        let max = Price::new(Decimal::MAX);
        assert!(max.discounted(Decimal::new(10, 0)) < max);
        assert_eq!(max.discounted(Decimal::ZERO), max);
        assert_eq!(max.discounted(Decimal::ONE_HUNDRED), Price::ZERO);
    }
}
