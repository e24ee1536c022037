//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Currency every price in the store is quoted in.
pub const STORE_CURRENCY: &str = "VND";

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > 50 { return Err(SkuError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(SkuError::InvalidCharacter);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuError {
    #[error("SKU empty")]
    Empty,
    #[error("SKU too long")]
    TooLong,
    #[error("SKU may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn vnd(amount: Decimal) -> Self { Self::new(amount, STORE_CURRENCY) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    /// Subtracts, flooring at zero. Prices never go negative.
    pub fn saturating_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        Ok(Money::new((self.amount - other.amount).max(Decimal::ZERO), &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// `rate` is a fraction (0.08 for 8%). Rounded to whole currency units,
    /// halves away from zero.
    pub fn scale(&self, rate: Decimal) -> Money {
        let scaled = (self.amount * rate).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Money::new(scaled, &self.currency)
    }

    pub fn min(&self, other: &Money) -> Money {
        if other.amount < self.amount { other.clone() } else { self.clone() }
    }

    fn same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(())
    }
}

impl Default for Money { fn default() -> Self { Self::zero(STORE_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Currency mismatch")]
    CurrencyMismatch,
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

/// Customer phone number, digits only with an optional leading `+`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    pub fn parse(value: impl Into<String>) -> Result<Self, PhoneError> {
        let value: String = value.into().chars().filter(|c| !c.is_whitespace()).collect();
        let digits = value.strip_prefix('+').unwrap_or(&value);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::Invalid);
        }
        if !(9..=15).contains(&digits.len()) { return Err(PhoneError::Length); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(value) }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self { phone.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("phone number may only contain digits")]
    Invalid,
    #[error("phone number must have 9 to 15 digits")]
    Length,
}

/// Star rating between 1 and 5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (1..=5).contains(&value) { Ok(Self(value)) } else { Err(RatingError(value)) }
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;
    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self { r.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rating {0} is outside 1..=5")]
pub struct RatingError(pub u8);

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_sku() { let sku = Sku::new("prod-001").unwrap(); assert_eq!(sku.as_str(), "PROD-001"); }
    #[test]
    fn test_sku_rejects_spaces() { assert_eq!(Sku::new("A B"), Err(SkuError::InvalidCharacter)); }
    #[test]
    fn test_money_add() {
        let a = Money::vnd(Decimal::new(100, 0));
        let b = Money::vnd(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
    }
    #[test]
    fn test_money_saturating_sub_floors_at_zero() {
        let a = Money::vnd(Decimal::new(10, 0));
        let b = Money::vnd(Decimal::new(50, 0));
        assert!(a.saturating_sub(&b).unwrap().is_zero());
        assert_eq!(a.add(&Money::usd_for_test()), Err(MoneyError::CurrencyMismatch));
    }
    #[test]
    fn test_money_scale_rounds() {
        let a = Money::vnd(Decimal::new(12345, 0));
        assert_eq!(a.scale(Decimal::new(8, 2)).amount(), Decimal::new(988, 0));
    }
    #[test]
    fn test_money_scale_rounds_halves_up() {
        let tenth = Decimal::new(1, 1);
        assert_eq!(Money::vnd(Decimal::new(12345, 0)).scale(tenth).amount(), Decimal::new(1235, 0));
        assert_eq!(Money::vnd(Decimal::new(12325, 0)).scale(tenth).amount(), Decimal::new(1233, 0));
        assert_eq!(Money::vnd(Decimal::new(12315, 0)).scale(tenth).amount(), Decimal::new(1232, 0));
    }
    #[test]
    fn test_phone() {
        assert_eq!(Phone::parse("0901 234 567").unwrap().as_str(), "0901234567");
        assert_eq!(Phone::parse("09abc"), Err(PhoneError::Invalid));
        assert_eq!(Phone::parse("0901"), Err(PhoneError::Length));
    }
    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
    }

    impl Money {
        fn usd_for_test() -> Self { Self::new(Decimal::ONE, "USD") }
    }
}
