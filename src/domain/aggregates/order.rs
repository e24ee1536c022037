//! Order Aggregate
//!
//! Orders move through a fixed lifecycle. Every status change goes through
//! [`Order::transition_to`], which rejects moves the lifecycle does not allow
//! and stamps the time each status was first reached in `routes`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use crate::domain::aggregates::PromotionSnapshot;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, Sku};

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    order_id: String,
    customer_id: String,
    shipping_info: ShippingInfo,
    items: Vec<OrderItem>,
    promotion_code: Option<String>,
    pricing: PricingBreakdown,
    invoice: Option<InvoiceInfo>,
    payment_method: PaymentMethod,
    status: OrderStatus,
    routes: BTreeMap<OrderStatus, DateTime<Utc>>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: Sku,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub item_type: ItemType,
    #[serde(default)]
    pub promotion: Option<PromotionSnapshot>,
    #[serde(default)]
    pub reviewed: bool,
}

impl OrderItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType { Purchased, Gifted }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub city: String,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceInfo {
    pub company_name: String,
    pub tax_code: String,
    pub address: String,
    pub email: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { #[default] Cod, BankTransfer }

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Cod => "cod", Self::BankTransfer => "bank_transfer" }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "bank_transfer" => Ok(Self::BankTransfer),
            other => Err(OrderError::UnknownValue(other.to_string())),
        }
    }
}

/// Price breakdown frozen on the order at checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub order_discount: Money,
    pub shipping_discount: Money,
    pub vat: Money,
    pub total: Money,
}

impl PricingBreakdown {
    /// Combined discount across order and shipping.
    pub fn discount(&self) -> Money {
        self.order_discount.add(&self.shipping_discount).unwrap_or_else(|_| self.order_discount.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipping,
    Delivered,
    Completed,
    CancelRequested,
    Cancelled,
    ReturnRequested,
    Returning,
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 10] = [
        Self::Pending, Self::Confirmed, Self::Shipping, Self::Delivered, Self::Completed,
        Self::CancelRequested, Self::Cancelled, Self::ReturnRequested, Self::Returning, Self::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::CancelRequested => "cancel_requested",
            Self::Cancelled => "cancelled",
            Self::ReturnRequested => "return_requested",
            Self::Returning => "returning",
            Self::Returned => "returned",
        }
    }

    /// Statuses reachable in one step from `self`.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, CancelRequested, Cancelled],
            Confirmed => &[Shipping, CancelRequested, Cancelled],
            CancelRequested => &[Cancelled, Confirmed],
            Shipping => &[Delivered],
            Delivered => &[Completed, ReturnRequested],
            ReturnRequested => &[Returning, Completed],
            Returning => &[Returned],
            Completed | Cancelled | Returned => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool { self.allowed_next().contains(&next) }
    pub fn is_terminal(&self) -> bool { self.allowed_next().is_empty() }

    /// Stock goes back to the shelf when an order ends in one of these.
    pub fn restocks(&self) -> bool { matches!(self, Self::Cancelled | Self::Returned) }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| OrderError::UnknownValue(s.to_string()))
    }
}

/// Everything checkout collects before an order exists.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub order_id: String,
    pub customer_id: String,
    pub shipping_info: ShippingInfo,
    pub items: Vec<OrderItem>,
    pub promotion_code: Option<String>,
    pub pricing: PricingBreakdown,
    pub invoice: Option<InvoiceInfo>,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
}

/// Persisted state used to rebuild an order from storage.
#[derive(Clone, Debug)]
pub struct OrderRecord {
    pub order: NewOrder,
    pub status: OrderStatus,
    pub routes: BTreeMap<OrderStatus, DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn place(new: NewOrder) -> Result<Self, OrderError> {
        if !new.items.iter().any(|i| i.item_type == ItemType::Purchased) { return Err(OrderError::NoItems); }
        if new.shipping_info.full_name.trim().is_empty() || new.shipping_info.address.trim().is_empty() {
            return Err(OrderError::MissingShippingInfo);
        }
        let now = Utc::now();
        let mut order = Self::restore(OrderRecord {
            order: new,
            status: OrderStatus::Pending,
            routes: BTreeMap::from([(OrderStatus::Pending, now)]),
            created_at: now,
            updated_at: now,
        });
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            total: order.pricing.total.amount(),
        }));
        Ok(order)
    }

    pub fn restore(r: OrderRecord) -> Self {
        let o = r.order;
        Self {
            order_id: o.order_id, customer_id: o.customer_id, shipping_info: o.shipping_info,
            items: o.items, promotion_code: o.promotion_code, pricing: o.pricing, invoice: o.invoice,
            payment_method: o.payment_method, status: r.status, routes: r.routes, note: o.note,
            created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        }
    }

    pub fn order_id(&self) -> &str { &self.order_id }
    pub fn customer_id(&self) -> &str { &self.customer_id }
    pub fn shipping_info(&self) -> &ShippingInfo { &self.shipping_info }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn promotion_code(&self) -> Option<&str> { self.promotion_code.as_deref() }
    pub fn pricing(&self) -> &PricingBreakdown { &self.pricing }
    pub fn invoice(&self) -> Option<&InvoiceInfo> { self.invoice.as_ref() }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn routes(&self) -> &BTreeMap<OrderStatus, DateTime<Utc>> { &self.routes }
    pub fn note(&self) -> Option<&str> { self.note.as_deref() }
    pub fn total(&self) -> &Money { &self.pricing.total }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn transition_to(&mut self, next: OrderStatus, reason: Option<String>) -> Result<(), OrderError> {
        let from = self.status;
        if !from.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from, to: next });
        }
        self.status = next;
        let now = Utc::now();
        self.routes.entry(next).or_insert(now);
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            self.note = Some(format!("{next}: {reason}"));
        }
        self.updated_at = now;
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.order_id.clone(), from, to: next }));
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), OrderError> { self.transition_to(OrderStatus::Confirmed, None) }
    pub fn ship(&mut self) -> Result<(), OrderError> { self.transition_to(OrderStatus::Shipping, None) }
    pub fn deliver(&mut self) -> Result<(), OrderError> { self.transition_to(OrderStatus::Delivered, None) }
    pub fn complete(&mut self) -> Result<(), OrderError> { self.transition_to(OrderStatus::Completed, None) }

    /// A customer cancels outright while pending; once confirmed it becomes a request.
    pub fn cancel_by_customer(&mut self, reason: Option<String>) -> Result<(), OrderError> {
        let next = if self.status == OrderStatus::Pending { OrderStatus::Cancelled } else { OrderStatus::CancelRequested };
        self.transition_to(next, reason)
    }

    pub fn request_return(&mut self, reason: Option<String>) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::ReturnRequested, reason)
    }

    pub fn contains_purchased(&self, sku: &Sku) -> bool {
        self.items.iter().any(|i| i.item_type == ItemType::Purchased && &i.sku == sku)
    }

    pub fn is_reviewable(&self) -> bool { matches!(self.status, OrderStatus::Delivered | OrderStatus::Completed) }

    /// Marks the purchased line for `sku` as reviewed. Returns true once every
    /// purchased line in the order has been reviewed.
    pub fn mark_reviewed(&mut self, sku: &Sku) -> Result<bool, OrderError> {
        if !self.is_reviewable() { return Err(OrderError::NotReviewable(self.status)); }
        let line = self.items.iter_mut()
            .find(|i| i.item_type == ItemType::Purchased && &i.sku == sku)
            .ok_or_else(|| OrderError::ItemNotInOrder(sku.to_string()))?;
        if line.reviewed { return Err(OrderError::AlreadyReviewed(sku.to_string())); }
        line.reviewed = true;
        self.updated_at = Utc::now();
        Ok(self.all_reviewed())
    }

    pub fn all_reviewed(&self) -> bool {
        self.items.iter().filter(|i| i.item_type == ItemType::Purchased).all(|i| i.reviewed)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no purchased items")]
    NoItems,
    #[error("Shipping name and address are required")]
    MissingShippingInfo,
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Orders in status {0} cannot be reviewed")]
    NotReviewable(OrderStatus),
    #[error("Item {0} was not purchased in this order")]
    ItemNotInOrder(String),
    #[error("Item {0} has already been reviewed for this order")]
    AlreadyReviewed(String),
    #[error("Unknown value '{0}'")]
    UnknownValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(sku: &str, item_type: ItemType) -> OrderItem {
        OrderItem {
            sku: Sku::new(sku).unwrap(), name: "Widget".into(), quantity: 2,
            unit_price: Money::vnd(Decimal::new(10_000, 0)), item_type, promotion: None, reviewed: false,
        }
    }

    fn new_order(items: Vec<OrderItem>) -> NewOrder {
        NewOrder {
            order_id: "ORD-00000001".into(),
            customer_id: "KH001".into(),
            shipping_info: ShippingInfo { full_name: "Nguyen Van A".into(), address: "1 Le Loi".into(), city: "HCM".into(), ..Default::default() },
            items,
            promotion_code: None,
            pricing: PricingBreakdown::default(),
            invoice: None,
            payment_method: PaymentMethod::Cod,
            note: None,
        }
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::place(new_order(vec![line("W001", ItemType::Purchased)])).unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        order.confirm().unwrap();
        order.ship().unwrap();
        order.deliver().unwrap();
        order.complete().unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.routes().len(), 5);
        assert!(order.status().is_terminal());
        assert_eq!(order.take_events().len(), 5);
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let mut order = Order::place(new_order(vec![line("W001", ItemType::Purchased)])).unwrap();
        assert_eq!(
            order.deliver(),
            Err(OrderError::InvalidTransition { from: OrderStatus::Pending, to: OrderStatus::Delivered })
        );
        order.confirm().unwrap();
        order.ship().unwrap();
        assert!(order.cancel_by_customer(None).is_err());
        assert_eq!(order.status(), OrderStatus::Shipping);
    }

    #[test]
    fn test_cancel_flow() {
        let mut order = Order::place(new_order(vec![line("W001", ItemType::Purchased)])).unwrap();
        order.cancel_by_customer(Some("changed my mind".into())).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.status().restocks());
        assert_eq!(order.note(), Some("cancelled: changed my mind"));

        let mut order = Order::place(new_order(vec![line("W001", ItemType::Purchased)])).unwrap();
        order.confirm().unwrap();
        order.cancel_by_customer(None).unwrap();
        assert_eq!(order.status(), OrderStatus::CancelRequested);
        order.transition_to(OrderStatus::Confirmed, Some("already packed".into())).unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
    }

    #[test]
    fn test_return_flow() {
        let mut order = Order::place(new_order(vec![line("W001", ItemType::Purchased)])).unwrap();
        for s in [OrderStatus::Confirmed, OrderStatus::Shipping, OrderStatus::Delivered] {
            order.transition_to(s, None).unwrap();
        }
        order.request_return(Some("damaged".into())).unwrap();
        order.transition_to(OrderStatus::Returning, None).unwrap();
        order.transition_to(OrderStatus::Returned, None).unwrap();
        assert!(order.status().restocks());
        assert!(order.complete().is_err());
    }

    #[test]
    fn test_order_needs_purchased_items_and_address() {
        assert_eq!(Order::place(new_order(vec![line("G1", ItemType::Gifted)])).unwrap_err(), OrderError::NoItems);
        let mut n = new_order(vec![line("W001", ItemType::Purchased)]);
        n.shipping_info.address = " ".into();
        assert_eq!(Order::place(n).unwrap_err(), OrderError::MissingShippingInfo);
    }

    #[test]
    fn test_review_tracking() {
        let mut order = Order::place(new_order(vec![
            line("A1", ItemType::Purchased),
            line("B1", ItemType::Purchased),
            line("A1", ItemType::Gifted),
        ])).unwrap();
        let a = Sku::new("A1").unwrap();
        assert_eq!(order.mark_reviewed(&a), Err(OrderError::NotReviewable(OrderStatus::Pending)));
        for s in [OrderStatus::Confirmed, OrderStatus::Shipping, OrderStatus::Delivered] {
            order.transition_to(s, None).unwrap();
        }
        assert_eq!(order.mark_reviewed(&a), Ok(false));
        assert_eq!(order.mark_reviewed(&a), Err(OrderError::AlreadyReviewed("A1".into())));
        assert_eq!(order.mark_reviewed(&Sku::new("B1").unwrap()), Ok(true));
        assert!(matches!(order.mark_reviewed(&Sku::new("Z9").unwrap()), Err(OrderError::ItemNotInOrder(_))));
    }

    #[test]
    fn test_status_text_round_trip() {
        for s in OrderStatus::ALL {
            assert_eq!(s.as_str().parse::<OrderStatus>().unwrap(), s);
        }
        let json = serde_json::to_string(&OrderStatus::CancelRequested).unwrap();
        assert_eq!(json, "\"cancel_requested\"");
    }
}
