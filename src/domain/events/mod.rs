//! Domain events
use crate::domain::aggregates::{CustomerTier, OrderStatus};
use crate::domain::value_objects::Sku;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Customer(CustomerEvent),
    Review(ReviewEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { sku: Sku },
    Published { sku: Sku },
    Archived { sku: Sku },
    InventoryAdded { sku: Sku, quantity: u32 },
    InventoryRemoved { sku: Sku, quantity: u32 },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: String, customer_id: String, total: Decimal },
    StatusChanged { order_id: String, from: OrderStatus, to: OrderStatus },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CustomerEvent {
    Registered { customer_id: String },
    PasswordChanged { customer_id: String, password_version: u32 },
    TierChanged { customer_id: String, from: CustomerTier, to: CustomerTier },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReviewEvent {
    Added { sku: Sku, review_id: String, rating: u8 },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        let (aggregate, event) = match self {
            Self::Product(e) => ("product", match e {
                ProductEvent::Created { .. } => "created",
                ProductEvent::Published { .. } => "published",
                ProductEvent::Archived { .. } => "archived",
                ProductEvent::InventoryAdded { .. } => "inventory_added",
                ProductEvent::InventoryRemoved { .. } => "inventory_removed",
            }),
            Self::Order(e) => ("order", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::StatusChanged { .. } => "status_changed",
            }),
            Self::Customer(e) => ("customer", match e {
                CustomerEvent::Registered { .. } => "registered",
                CustomerEvent::PasswordChanged { .. } => "password_changed",
                CustomerEvent::TierChanged { .. } => "tier_changed",
            }),
            Self::Review(ReviewEvent::Added { .. }) => ("review", "added"),
        };
        format!("storefront.{aggregate}.{event}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_naming() {
        let e = DomainEvent::Order(OrderEvent::StatusChanged {
            order_id: "ORD-1".into(),
            from: OrderStatus::Pending,
            to: OrderStatus::Confirmed,
        });
        assert_eq!(e.subject(), "storefront.order.status_changed");
    }

    #[test]
    fn test_event_payload_is_tagged() {
        let e = DomainEvent::Review(ReviewEvent::Added { sku: Sku::new("A1").unwrap(), review_id: "r".into(), rating: 4 });
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["aggregate"], "review");
        assert_eq!(json["event"], "added");
        assert_eq!(json["rating"], 4);
    }
}
