//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use crate::domain::value_objects::{Sku, Money, Quantity};
use crate::domain::events::{DomainEvent, ProductEvent};

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    sku: Sku,
    name: String,
    description: String,
    category: String,
    subcategory: Option<String>,
    brand: Option<String>,
    price: Money,
    stock: Quantity,
    rating: f64,
    review_count: u32,
    purchase_count: u32,
    images: Vec<String>,
    groups: Vec<String>,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Draft, Active, Archived }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Draft => "draft", Self::Active => "active", Self::Archived => "archived" }
    }
}

impl FromStr for ProductStatus {
    type Err = ProductError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(ProductError::UnknownStatus(other.to_string())),
        }
    }
}

/// Editable catalog attributes of a product.
#[derive(Clone, Debug, Default)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub images: Vec<String>,
    pub groups: Vec<String>,
}

/// Persisted state used to rebuild a product from storage.
#[derive(Clone, Debug)]
pub struct ProductRecord {
    pub sku: Sku,
    pub details: ProductDetails,
    pub price: Money,
    pub stock: Quantity,
    pub rating: f64,
    pub review_count: u32,
    pub purchase_count: u32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(sku: Sku, details: ProductDetails, price: Money) -> Self {
        let now = Utc::now();
        let mut product = Self {
            sku: sku.clone(), name: details.name, description: details.description,
            category: details.category, subcategory: details.subcategory, brand: details.brand,
            price, stock: Quantity::default(), rating: 0.0, review_count: 0, purchase_count: 0,
            images: details.images, groups: details.groups,
            status: ProductStatus::Draft, created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { sku }));
        product
    }

    pub fn restore(r: ProductRecord) -> Self {
        Self {
            sku: r.sku, name: r.details.name, description: r.details.description,
            category: r.details.category, subcategory: r.details.subcategory, brand: r.details.brand,
            price: r.price, stock: r.stock, rating: r.rating, review_count: r.review_count,
            purchase_count: r.purchase_count, images: r.details.images, groups: r.details.groups,
            status: r.status, created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        }
    }

    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn category(&self) -> &str { &self.category }
    pub fn subcategory(&self) -> Option<&str> { self.subcategory.as_deref() }
    pub fn brand(&self) -> Option<&str> { self.brand.as_deref() }
    pub fn price(&self) -> &Money { &self.price }
    pub fn stock(&self) -> &Quantity { &self.stock }
    pub fn rating(&self) -> f64 { self.rating }
    pub fn review_count(&self) -> u32 { self.review_count }
    pub fn purchase_count(&self) -> u32 { self.purchase_count }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn groups(&self) -> &[String] { &self.groups }
    pub fn status(&self) -> ProductStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_in_stock(&self) -> bool { !self.stock.is_zero() }
    pub fn is_purchasable(&self) -> bool { self.status == ProductStatus::Active && self.is_in_stock() }

    pub fn publish(&mut self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if self.status == ProductStatus::Active { return Ok(()); }
        self.status = ProductStatus::Active;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Published { sku: self.sku.clone() }));
        Ok(())
    }

    pub fn archive(&mut self) {
        self.status = ProductStatus::Archived;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Archived { sku: self.sku.clone() }));
    }

    pub fn update_details(&mut self, details: ProductDetails) -> Result<(), ProductError> {
        if details.name.trim().is_empty() { return Err(ProductError::MissingName); }
        self.name = details.name;
        self.description = details.description;
        self.category = details.category;
        self.subcategory = details.subcategory;
        self.brand = details.brand;
        self.images = details.images;
        self.groups = details.groups;
        self.touch();
        Ok(())
    }

    pub fn update_price(&mut self, new_price: Money) {
        self.price = new_price;
        self.touch();
    }

    pub fn add_inventory(&mut self, qty: u32) {
        if qty == 0 { return; }
        self.stock = self.stock.add(qty);
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::InventoryAdded { sku: self.sku.clone(), quantity: qty }));
    }

    pub fn remove_inventory(&mut self, qty: u32) -> Result<(), ProductError> {
        self.stock = self.stock.subtract(qty).ok_or_else(|| ProductError::InsufficientInventory {
            sku: self.sku.to_string(), requested: qty, available: self.stock.value(),
        })?;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::InventoryRemoved { sku: self.sku.clone(), quantity: qty }));
        Ok(())
    }

    /// Sets stock to an absolute level, as done by catalog edits.
    pub fn set_inventory(&mut self, qty: u32) {
        let current = self.stock.value();
        if qty > current { self.add_inventory(qty - current); }
        else if qty < current {
            self.stock = Quantity::new(qty);
            self.touch();
            self.raise_event(DomainEvent::Product(ProductEvent::InventoryRemoved { sku: self.sku.clone(), quantity: current - qty }));
        }
    }

    pub fn record_sale(&mut self, qty: u32) {
        self.purchase_count = self.purchase_count.saturating_add(qty);
        self.touch();
    }

    pub fn revert_sale(&mut self, qty: u32) {
        self.purchase_count = self.purchase_count.saturating_sub(qty);
        self.touch();
    }

    pub fn set_rating(&mut self, average: f64, count: u32) {
        self.rating = average;
        self.review_count = count;
        self.touch();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Missing name")]
    MissingName,
    #[error("Insufficient inventory for {sku}: requested {requested}, available {available}")]
    InsufficientInventory { sku: String, requested: u32, available: u32 },
    #[error("Product {0} is not available for sale")]
    NotPurchasable(String),
    #[error("Unknown product status '{0}'")]
    UnknownStatus(String),
}
