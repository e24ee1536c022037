//! Promotion pricing rules.
//!
//! Product-scoped promotions (category, product, brand) change the unit price
//! shown in the catalog and copied into carts. Order and shipping promotions
//! are redeemed by code and only affect the checkout breakdown.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::domain::aggregates::{
    CartItem, DiscountType, ItemType, OrderItem, PricingBreakdown, Product, Promotion, PromotionError, PromotionScope,
    PromotionSnapshot, PromotionTarget,
};
use crate::domain::value_objects::{Money, Sku, STORE_CURRENCY};

/// A promotion together with the targets that decide which products it reaches.
#[derive(Clone, Debug)]
pub struct TargetedPromotion {
    pub promotion: Promotion,
    pub targets: Vec<PromotionTarget>,
}

impl TargetedPromotion {
    pub fn applies_to(&self, product: &Product, now: DateTime<Utc>) -> bool {
        !self.promotion.scope.is_checkout_scope()
            && self.promotion.is_available(now)
            && self.targets.iter().any(|t| t.matches(product))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductPrice {
    pub sku: Sku,
    pub original_price: Money,
    pub final_price: Money,
    pub promotion: Option<PromotionSnapshot>,
}

/// Amount `promotion` takes off `base`.
pub fn discount_for(promotion: &Promotion, base: &Money) -> Money {
    match promotion.discount_type {
        DiscountType::Percent => {
            let raw = base.scale(promotion.discount_value / Decimal::ONE_HUNDRED);
            let capped = match &promotion.max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            };
            capped.min(base)
        }
        DiscountType::Fixed => Money::new(promotion.discount_value, base.currency()).min(base),
        DiscountType::Buy1Get1 => Money::zero(base.currency()),
    }
}

/// Picks the promotion giving the largest discount on `product`. A buy1get1
/// promotion is only attached when nothing lowers the price.
pub fn price_product(product: &Product, promotions: &[TargetedPromotion], now: DateTime<Utc>) -> ProductPrice {
    let original = product.price().clone();
    let applicable: Vec<&Promotion> = promotions.iter()
        .filter(|p| p.applies_to(product, now))
        .map(|p| &p.promotion)
        .collect();

    let best_discount = applicable.iter()
        .filter(|p| p.discount_type != DiscountType::Buy1Get1)
        .map(|p| (*p, discount_for(p, &original)))
        .filter(|(_, d)| !d.is_zero())
        .max_by(|(_, a), (_, b)| a.amount().cmp(&b.amount()));

    let chosen = match best_discount {
        Some((promo, discount)) => {
            let final_price = original.saturating_sub(&discount).unwrap_or_else(|_| original.clone());
            Some((promo, final_price))
        }
        None => applicable.iter()
            .find(|p| p.discount_type == DiscountType::Buy1Get1)
            .map(|p| (*p, original.clone())),
    };

    match chosen {
        Some((promo, final_price)) => ProductPrice {
            sku: product.sku().clone(),
            promotion: Some(promo.snapshot(&original, final_price.clone())),
            final_price,
            original_price: original,
        },
        None => ProductPrice { sku: product.sku().clone(), final_price: original.clone(), original_price: original, promotion: None },
    }
}

/// Turns selected cart lines into order lines, adding a free gifted line
/// for every buy1get1 line.
pub fn order_lines<'a>(items: impl IntoIterator<Item = &'a CartItem>) -> Vec<OrderItem> {
    let mut lines = Vec::new();
    for item in items {
        lines.push(OrderItem {
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.effective_price().clone(),
            item_type: ItemType::Purchased,
            promotion: item.promotion.clone(),
            reviewed: false,
        });
        if item.has_bonus() {
            lines.push(OrderItem {
                sku: item.sku.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: Money::zero(item.unit_price.currency()),
                item_type: ItemType::Gifted,
                promotion: item.promotion.clone(),
                reviewed: false,
            });
        }
    }
    lines
}

/// Stock units a cart line consumes: buy1get1 lines ship a free unit per
/// purchased unit.
pub fn units_required(quantity: u32, promotion: Option<&PromotionSnapshot>) -> u32 {
    if promotion.is_some_and(|p| p.bonus_item) { quantity.saturating_mul(2) } else { quantity }
}

pub fn lines_subtotal(lines: &[OrderItem]) -> Money {
    lines.iter().fold(Money::zero(STORE_CURRENCY), |acc, l| acc.add(&l.line_total()).unwrap_or(acc))
}

/// Checkout breakdown for `subtotal` with an optional promotion code.
///
/// VAT is charged on the subtotal after the order discount; the shipping
/// fee is not taxed.
pub fn quote(
    subtotal: &Money,
    shipping_fee: &Money,
    promotion: Option<&Promotion>,
    vat_rate: Decimal,
    now: DateTime<Utc>,
) -> Result<PricingBreakdown, PromotionError> {
    let zero = Money::zero(subtotal.currency());
    let (order_discount, shipping_discount) = match promotion {
        None => (zero.clone(), zero.clone()),
        Some(p) => {
            p.ensure_available(now)?;
            if subtotal.amount() < p.min_order_value.amount() {
                return Err(PromotionError::BelowMinimum { required: p.min_order_value.clone() });
            }
            match p.scope {
                PromotionScope::Order => (discount_for(p, subtotal), zero.clone()),
                PromotionScope::Shipping => (zero.clone(), discount_for(p, shipping_fee)),
                _ => return Err(PromotionError::NotRedeemable(p.code.clone())),
            }
        }
    };

    let taxable = subtotal.saturating_sub(&order_discount).unwrap_or_else(|_| subtotal.clone());
    let vat = taxable.scale(vat_rate);
    let shipping = shipping_fee.saturating_sub(&shipping_discount).unwrap_or_else(|_| shipping_fee.clone());
    let total = taxable.add(&vat).and_then(|t| t.add(&shipping)).unwrap_or_else(|_| taxable.clone());

    Ok(PricingBreakdown {
        subtotal: subtotal.clone(),
        shipping_fee: shipping_fee.clone(),
        order_discount,
        shipping_discount,
        vat,
        total,
    })
}
