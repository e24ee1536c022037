//! Customer tier thresholds.

use rust_decimal::Decimal;
use crate::domain::aggregates::{CustomerTier, Order, OrderStatus};
use crate::domain::value_objects::{Money, STORE_CURRENCY};

/// Lifetime spend (VND) at which each tier above Đồng starts.
pub const SILVER_THRESHOLD: i64 = 5_000_000;
pub const GOLD_THRESHOLD: i64 = 20_000_000;
pub const PLATINUM_THRESHOLD: i64 = 50_000_000;

pub fn tier_for(total_spent: &Money) -> CustomerTier {
    let amount = total_spent.amount();
    if amount >= Decimal::from(PLATINUM_THRESHOLD) {
        CustomerTier::Platinum
    } else if amount >= Decimal::from(GOLD_THRESHOLD) {
        CustomerTier::Gold
    } else if amount >= Decimal::from(SILVER_THRESHOLD) {
        CustomerTier::Silver
    } else {
        CustomerTier::Bronze
    }
}

/// Sum of order totals over completed orders only.
pub fn lifetime_spend<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Money {
    orders.into_iter()
        .filter(|o| o.status() == OrderStatus::Completed)
        .fold(Money::zero(STORE_CURRENCY), |acc, o| acc.add(o.total()).unwrap_or(acc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vnd(v: i64) -> Money { Money::vnd(Decimal::new(v, 0)) }

    #[test]
    fn test_thresholds_are_inclusive() {
        assert_eq!(tier_for(&vnd(0)), CustomerTier::Bronze);
        assert_eq!(tier_for(&vnd(4_999_999)), CustomerTier::Bronze);
        assert_eq!(tier_for(&vnd(5_000_000)), CustomerTier::Silver);
        assert_eq!(tier_for(&vnd(20_000_000)), CustomerTier::Gold);
        assert_eq!(tier_for(&vnd(50_000_000)), CustomerTier::Platinum);
    }

    #[test]
    fn test_only_completed_orders_count() {
        use crate::domain::aggregates::{NewOrder, OrderRecord, PaymentMethod, PricingBreakdown, ShippingInfo};
        use chrono::Utc;
        use std::collections::BTreeMap;

        let order = |id: &str, status: OrderStatus, total: i64| Order::restore(OrderRecord {
            order: NewOrder {
                order_id: id.into(),
                customer_id: "KH001".into(),
                shipping_info: ShippingInfo::default(),
                items: vec![],
                promotion_code: None,
                pricing: PricingBreakdown { total: vnd(total), ..Default::default() },
                invoice: None,
                payment_method: PaymentMethod::Cod,
                note: None,
            },
            status,
            routes: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        let orders = [
            order("O1", OrderStatus::Completed, 3_000_000),
            order("O2", OrderStatus::Cancelled, 9_000_000),
            order("O3", OrderStatus::Completed, 2_500_000),
            order("O4", OrderStatus::Delivered, 1_000_000),
        ];
        let spend = lifetime_spend(&orders);
        assert_eq!(spend, vnd(5_500_000));
        assert_eq!(tier_for(&spend), CustomerTier::Silver);
    }
}
