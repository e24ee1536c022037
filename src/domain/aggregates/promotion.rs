//! Promotion Aggregate
//!
//! A promotion is a standalone discount object. Which products it reaches is
//! decided by [`PromotionTarget`] rows for the category, product and brand
//! scopes; order and shipping scoped promotions are redeemed by code at
//! checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percent,
    Fixed,
    #[serde(rename = "buy1get1")]
    Buy1Get1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionScope { Order, Shipping, Category, Product, Brand }

impl PromotionScope {
    /// Scopes redeemed by code against a whole order.
    pub fn is_checkout_scope(&self) -> bool { matches!(self, Self::Order | Self::Shipping) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType { Category, Subcategory, Brand, Product }

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $text),+ }
            }
        }

        impl FromStr for $ty {
            type Err = PromotionError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(PromotionError::UnknownValue(other.to_string())),
                }
            }
        }
    };
}

text_enum!(DiscountType { Percent => "percent", Fixed => "fixed", Buy1Get1 => "buy1get1" });
text_enum!(PromotionScope { Order => "order", Shipping => "shipping", Category => "category", Product => "product", Brand => "brand" });
text_enum!(TargetType { Category => "category", Subcategory => "subcategory", Brand => "brand", Product => "product" });

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub promotion_id: String,
    pub code: String,
    pub name: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Money>,
    pub scope: PromotionScope,
    pub min_order_value: Money,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Terms accepted when creating or editing a promotion.
#[derive(Clone, Debug)]
pub struct PromotionTerms {
    pub code: String,
    pub name: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Money>,
    pub scope: PromotionScope,
    pub min_order_value: Money,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: Option<u32>,
}

impl Promotion {
    pub fn create(promotion_id: impl Into<String>, terms: PromotionTerms) -> Result<Self, PromotionError> {
        validate_terms(&terms)?;
        let now = Utc::now();
        Ok(Self {
            promotion_id: promotion_id.into(),
            code: terms.code.trim().to_uppercase(),
            name: terms.name,
            description: terms.description,
            discount_type: terms.discount_type,
            discount_value: terms.discount_value,
            max_discount: terms.max_discount,
            scope: terms.scope,
            min_order_value: terms.min_order_value,
            start_date: terms.start_date,
            end_date: terms.end_date,
            usage_limit: terms.usage_limit,
            usage_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn revise(&mut self, terms: PromotionTerms) -> Result<(), PromotionError> {
        validate_terms(&terms)?;
        if let Some(limit) = terms.usage_limit {
            if limit < self.usage_count { return Err(PromotionError::LimitBelowUsage { limit, used: self.usage_count }); }
        }
        self.code = terms.code.trim().to_uppercase();
        self.name = terms.name;
        self.description = terms.description;
        self.discount_type = terms.discount_type;
        self.discount_value = terms.discount_value;
        self.max_discount = terms.max_discount;
        self.scope = terms.scope;
        self.min_order_value = terms.min_order_value;
        self.start_date = terms.start_date;
        self.end_date = terms.end_date;
        self.usage_limit = terms.usage_limit;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn deactivate(&mut self) { self.is_active = false; self.updated_at = Utc::now(); }

    /// Checks activity, date window and usage limit.
    pub fn ensure_available(&self, now: DateTime<Utc>) -> Result<(), PromotionError> {
        if !self.is_active { return Err(PromotionError::Inactive(self.code.clone())); }
        if now < self.start_date { return Err(PromotionError::NotStarted(self.code.clone())); }
        if now > self.end_date { return Err(PromotionError::Expired(self.code.clone())); }
        if self.usage_limit.is_some_and(|limit| self.usage_count >= limit) {
            return Err(PromotionError::UsageExhausted(self.code.clone()));
        }
        Ok(())
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool { self.ensure_available(now).is_ok() }

    pub fn record_usage(&mut self, now: DateTime<Utc>) -> Result<(), PromotionError> {
        self.ensure_available(now)?;
        self.usage_count += 1;
        self.updated_at = now;
        Ok(())
    }

    pub fn snapshot(&self, original: &Money, final_price: Money) -> PromotionSnapshot {
        PromotionSnapshot {
            promotion_id: self.promotion_id.clone(),
            code: self.code.clone(),
            discount_type: self.discount_type,
            original_price: original.clone(),
            discounted_price: final_price,
            bonus_item: self.discount_type == DiscountType::Buy1Get1,
        }
    }
}

fn validate_terms(terms: &PromotionTerms) -> Result<(), PromotionError> {
    if terms.code.trim().is_empty() { return Err(PromotionError::Invalid("code is required".into())); }
    if terms.end_date <= terms.start_date {
        return Err(PromotionError::Invalid("end_date must be after start_date".into()));
    }
    if terms.discount_value.is_sign_negative() {
        return Err(PromotionError::Invalid("discount_value must not be negative".into()));
    }
    match terms.discount_type {
        DiscountType::Percent if terms.discount_value > Decimal::ONE_HUNDRED => {
            Err(PromotionError::Invalid("percent discount cannot exceed 100".into()))
        }
        DiscountType::Buy1Get1 if terms.scope.is_checkout_scope() => {
            Err(PromotionError::Invalid("buy1get1 promotions must target products".into()))
        }
        _ => Ok(()),
    }
}

/// Maps a promotion to the products it reaches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionTarget {
    pub promotion_id: String,
    pub target_type: TargetType,
    pub target_ref: Vec<String>,
}

impl PromotionTarget {
    pub fn matches(&self, product: &Product) -> bool {
        let candidate = match self.target_type {
            TargetType::Category => Some(product.category()),
            TargetType::Subcategory => product.subcategory(),
            TargetType::Brand => product.brand(),
            TargetType::Product => Some(product.sku().as_str()),
        };
        let Some(candidate) = candidate else { return false };
        let candidate = candidate.to_lowercase();
        self.target_ref.iter().any(|r| r.trim().to_lowercase() == candidate)
    }
}

/// Promotion state copied into carts and orders at the time it was applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionSnapshot {
    pub promotion_id: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub original_price: Money,
    pub discounted_price: Money,
    pub bonus_item: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionError {
    #[error("Promotion {0} is inactive")]
    Inactive(String),
    #[error("Promotion {0} has not started yet")]
    NotStarted(String),
    #[error("Promotion {0} has expired")]
    Expired(String),
    #[error("Promotion {0} has reached its usage limit")]
    UsageExhausted(String),
    #[error("Order subtotal must be at least {required}")]
    BelowMinimum { required: Money },
    #[error("Promotion {0} cannot be redeemed at checkout")]
    NotRedeemable(String),
    #[error("Usage limit {limit} is below current usage {used}")]
    LimitBelowUsage { limit: u32, used: u32 },
    #[error("Invalid promotion: {0}")]
    Invalid(String),
    #[error("Unknown value '{0}'")]
    UnknownValue(String),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn terms(code: &str, discount_type: DiscountType, value: i64, scope: PromotionScope) -> PromotionTerms {
        let now = Utc::now();
        PromotionTerms {
            code: code.into(),
            name: code.into(),
            description: String::new(),
            discount_type,
            discount_value: Decimal::new(value, 0),
            max_discount: None,
            scope,
            min_order_value: Money::default(),
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            usage_limit: None,
        }
    }

    #[test]
    fn test_availability_window_and_limit() {
        let mut t = terms("sale", DiscountType::Fixed, 10_000, PromotionScope::Order);
        t.usage_limit = Some(1);
        let mut p = Promotion::create("P1", t).unwrap();
        assert_eq!(p.code, "SALE");
        let now = Utc::now();
        p.record_usage(now).unwrap();
        assert_eq!(p.record_usage(now), Err(PromotionError::UsageExhausted("SALE".into())));
        assert_eq!(p.ensure_available(now + Duration::days(2)), Err(PromotionError::Expired("SALE".into())));
        assert_eq!(p.ensure_available(now - Duration::days(2)), Err(PromotionError::NotStarted("SALE".into())));
    }

    #[test]
    fn test_terms_validation() {
        let t = terms("B1", DiscountType::Buy1Get1, 0, PromotionScope::Order);
        assert!(matches!(Promotion::create("P", t), Err(PromotionError::Invalid(_))));
        let t = terms("X", DiscountType::Percent, 150, PromotionScope::Category);
        assert!(matches!(Promotion::create("P", t), Err(PromotionError::Invalid(_))));
    }

    #[test]
    fn test_limit_cannot_drop_below_usage() {
        let mut p = Promotion::create("P", terms("A", DiscountType::Fixed, 1, PromotionScope::Order)).unwrap();
        p.usage_count = 3;
        let mut t = terms("A", DiscountType::Fixed, 1, PromotionScope::Order);
        t.usage_limit = Some(2);
        assert_eq!(p.revise(t), Err(PromotionError::LimitBelowUsage { limit: 2, used: 3 }));
    }

    #[test]
    fn test_target_matching_ignores_vietnamese_case() {
        use crate::domain::aggregates::ProductDetails;
        use crate::domain::value_objects::Sku;
        let details = ProductDetails {
            name: "Xe gỗ".into(), category: "Đồ chơi".into(), brand: Some("Ánh Dương".into()), ..Default::default()
        };
        let product = Product::create(Sku::new("TOY-01").unwrap(), details, Money::vnd(Decimal::new(90_000, 0)));
        let target = |target_type, r: &str| PromotionTarget { promotion_id: "P".into(), target_type, target_ref: vec![r.into()] };
        assert!(target(TargetType::Category, " đồ chơi ").matches(&product));
        assert!(target(TargetType::Brand, "ÁNH DƯƠNG").matches(&product));
        assert!(target(TargetType::Product, "toy-01").matches(&product));
        assert!(!target(TargetType::Subcategory, "đồ chơi").matches(&product));
    }

    #[test]
    fn test_text_round_trip_of_enums() {
        assert_eq!("buy1get1".parse::<DiscountType>().unwrap(), DiscountType::Buy1Get1);
        assert_eq!(PromotionScope::Shipping.as_str(), "shipping");
        assert!("weekly".parse::<TargetType>().is_err());
    }
}
