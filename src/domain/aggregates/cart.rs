//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::aggregates::PromotionSnapshot;
use crate::domain::value_objects::{Money, Sku, STORE_CURRENCY};

#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    customer_id: String,
    items: Vec<CartItem>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub sku: Sku,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default = "default_selected")]
    pub selected: bool,
    #[serde(default)]
    pub promotion: Option<PromotionSnapshot>,
}

fn default_selected() -> bool { true }

impl CartItem {
    /// Price actually charged per unit once a product promotion is applied.
    pub fn effective_price(&self) -> &Money {
        self.promotion.as_ref().map_or(&self.unit_price, |p| &p.discounted_price)
    }
    pub fn line_total(&self) -> Money { self.effective_price().multiply(self.quantity) }
    pub fn has_bonus(&self) -> bool { self.promotion.as_ref().is_some_and(|p| p.bonus_item) }
}

impl Cart {
    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self { customer_id: customer_id.into(), items: vec![], updated_at: Utc::now() }
    }

    /// Rebuilds a stored cart, merging duplicate SKUs.
    pub fn restore(customer_id: impl Into<String>, items: Vec<CartItem>, updated_at: DateTime<Utc>) -> Self {
        let mut cart = Self { customer_id: customer_id.into(), items: Vec::with_capacity(items.len()), updated_at };
        for item in items { cart.merge(item); }
        cart
    }

    pub fn customer_id(&self) -> &str { &self.customer_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn quantity_of(&self, sku: &Sku) -> u32 { self.items.iter().find(|i| &i.sku == sku).map_or(0, |i| i.quantity) }
    pub fn selected_items(&self) -> impl Iterator<Item = &CartItem> { self.items.iter().filter(|i| i.selected) }

    /// Total of the selected lines.
    pub fn subtotal(&self) -> Money {
        self.selected_items().fold(Money::zero(STORE_CURRENCY), |acc, i| acc.add(&i.line_total()).unwrap_or(acc))
    }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        self.merge(item);
        self.touch();
        Ok(())
    }

    pub fn update_quantity(&mut self, sku: &Sku, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| &i.sku == sku).ok_or_else(|| CartError::ItemNotFound(sku.to_string()))?;
        if quantity == 0 { self.items.retain(|i| &i.sku != sku); }
        else { item.quantity = quantity; }
        self.touch();
        Ok(())
    }

    pub fn set_selected(&mut self, sku: &Sku, selected: bool) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| &i.sku == sku).ok_or_else(|| CartError::ItemNotFound(sku.to_string()))?;
        item.selected = selected;
        self.touch();
        Ok(())
    }

    pub fn select_all(&mut self, selected: bool) {
        self.items.iter_mut().for_each(|i| i.selected = selected);
        self.touch();
    }

    /// Refreshes price and promotion snapshot of a line from the catalog.
    pub fn reprice(&mut self, sku: &Sku, unit_price: Money, promotion: Option<PromotionSnapshot>) {
        if let Some(item) = self.items.iter_mut().find(|i| &i.sku == sku) {
            item.unit_price = unit_price;
            item.promotion = promotion;
        }
    }

    pub fn remove_item(&mut self, sku: &Sku) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| &i.sku != sku);
        if self.items.len() == before { return Err(CartError::ItemNotFound(sku.to_string())); }
        self.touch();
        Ok(())
    }

    /// Drops the lines that were just turned into an order.
    pub fn remove_selected(&mut self) -> Vec<CartItem> {
        let (ordered, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items).into_iter().partition(|i| i.selected);
        self.items = kept;
        self.touch();
        ordered
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    fn merge(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.sku == item.sku) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            existing.unit_price = item.unit_price;
            existing.promotion = item.promotion;
            existing.selected |= item.selected;
        } else {
            self.items.push(item);
        }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item {0} not found in cart")]
    ItemNotFound(String),
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("No items selected for checkout")]
    NothingSelected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(sku: &str, qty: u32, price: i64) -> CartItem {
        CartItem { sku: Sku::new(sku).unwrap(), name: "Widget".into(), quantity: qty, unit_price: Money::vnd(Decimal::new(price, 0)), selected: true, promotion: None }
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::for_customer("KH001");
        cart.add_item(item("W1", 2, 10)).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(20, 0));
        cart.add_item(item("W1", 1, 10)).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        assert_eq!(cart.add_item(item("W2", 0, 10)), Err(CartError::InvalidQuantity));
    }

    #[test]
    fn test_restore_merges_duplicates() {
        let cart = Cart::restore("KH001", vec![item("A", 1, 5), item("B", 1, 7), item("A", 2, 5)], Utc::now());
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.quantity_of(&Sku::new("A").unwrap()), 3);
    }

    #[test]
    fn test_selection_drives_subtotal_and_checkout() {
        let mut cart = Cart::for_customer("KH001");
        cart.add_item(item("A", 1, 100)).unwrap();
        cart.add_item(item("B", 2, 50)).unwrap();
        cart.set_selected(&Sku::new("B").unwrap(), false).unwrap();
        assert_eq!(cart.subtotal().amount(), Decimal::new(100, 0));
        let ordered = cart.remove_selected();
        assert_eq!(ordered.len(), 1);
        assert_eq!(cart.items()[0].sku.as_str(), "B");
        cart.select_all(true);
        assert_eq!(cart.subtotal().amount(), Decimal::new(100, 0));
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let mut cart = Cart::for_customer("KH001");
        cart.add_item(item("A", 1, 100)).unwrap();
        cart.update_quantity(&Sku::new("A").unwrap(), 0).unwrap();
        assert!(cart.is_empty());
        assert!(matches!(cart.remove_item(&Sku::new("A").unwrap()), Err(CartError::ItemNotFound(_))));
    }
}
