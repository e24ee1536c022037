//! Per-customer carts.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use validator::Validate;

use super::AppState;
use crate::domain::aggregates::{Cart, CartItem, Product, ProductError};
use crate::domain::services::pricing;
use crate::domain::value_objects::{Money, Sku};
use crate::infrastructure::repositories::{carts, customers, products, promotions};
use crate::{EcommerceError, Result};

/// A cart with the total of its selected lines.
#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub subtotal: Money,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let subtotal = cart.subtotal();
        Self { cart, subtotal }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub sku: String,
    #[validate(range(min = 1, max = 999))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(max = 999))]
    pub quantity: Option<u32>,
    pub selected: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub selected: bool,
}

pub struct CartService<'a> {
    state: &'a AppState,
}

impl<'a> CartService<'a> {
    pub fn new(state: &'a AppState) -> Self { Self { state } }

    /// Returns the cart with prices refreshed from the catalog, creating it on first access.
    pub async fn get(&self, customer_id: &str) -> Result<CartView> {
        let mut tx = self.state.pool().begin().await?;
        let mut cart = load_or_create(&mut tx, customer_id).await?;
        refresh_prices(&mut tx, &mut cart).await?;
        carts::save(&mut *tx, &cart).await?;
        tx.commit().await?;
        Ok(cart.into())
    }

    pub async fn add_item(&self, customer_id: &str, req: AddItemRequest) -> Result<CartView> {
        req.validate()?;
        let sku = Sku::new(req.sku)?;
        let mut tx = self.state.pool().begin().await?;
        let mut cart = load_or_create(&mut tx, customer_id).await?;
        let product = products::find(&mut *tx, &sku)
            .await?
            .ok_or_else(|| EcommerceError::ProductNotFound(sku.to_string()))?;
        if !product.is_purchasable() {
            return Err(ProductError::NotPurchasable(sku.to_string()).into());
        }
        let targeted = promotions::targeted(&mut tx).await?;
        let priced = pricing::price_product(&product, &targeted, Utc::now());
        let wanted = cart.quantity_of(&sku).saturating_add(req.quantity);
        ensure_stock(&product, pricing::units_required(wanted, priced.promotion.as_ref()))?;
        cart.add_item(CartItem {
            sku: sku.clone(),
            name: product.name().to_string(),
            quantity: req.quantity,
            unit_price: priced.original_price,
            selected: true,
            promotion: priced.promotion,
        })?;
        carts::save(&mut *tx, &cart).await?;
        tx.commit().await?;
        tracing::debug!(customer_id, sku = %sku, quantity = req.quantity, "Item added to cart");
        Ok(cart.into())
    }

    /// Changes quantity and/or selection of one line. A quantity of 0 removes it.
    pub async fn update_item(&self, customer_id: &str, sku: &str, req: UpdateItemRequest) -> Result<CartView> {
        req.validate()?;
        let sku = Sku::new(sku)?;
        let mut tx = self.state.pool().begin().await?;
        let mut cart = load_or_create(&mut tx, customer_id).await?;
        if let Some(selected) = req.selected {
            cart.set_selected(&sku, selected)?;
        }
        if let Some(quantity) = req.quantity {
            if quantity > cart.quantity_of(&sku) {
                let product = products::find(&mut *tx, &sku)
                    .await?
                    .ok_or_else(|| EcommerceError::ProductNotFound(sku.to_string()))?;
                let promotion = cart.items().iter().find(|i| i.sku == sku).and_then(|i| i.promotion.as_ref());
                ensure_stock(&product, pricing::units_required(quantity, promotion))?;
            }
            cart.update_quantity(&sku, quantity)?;
        }
        carts::save(&mut *tx, &cart).await?;
        tx.commit().await?;
        Ok(cart.into())
    }

    pub async fn remove_item(&self, customer_id: &str, sku: &str) -> Result<CartView> {
        let sku = Sku::new(sku)?;
        self.modify(customer_id, |cart| Ok(cart.remove_item(&sku)?)).await
    }

    pub async fn select_all(&self, customer_id: &str, req: SelectionRequest) -> Result<CartView> {
        self.modify(customer_id, |cart| {
            cart.select_all(req.selected);
            Ok(())
        })
        .await
    }

    pub async fn clear(&self, customer_id: &str) -> Result<CartView> {
        self.modify(customer_id, |cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    async fn modify(&self, customer_id: &str, change: impl FnOnce(&mut Cart) -> Result<()>) -> Result<CartView> {
        let mut tx = self.state.pool().begin().await?;
        let mut cart = load_or_create(&mut tx, customer_id).await?;
        change(&mut cart)?;
        carts::save(&mut *tx, &cart).await?;
        tx.commit().await?;
        Ok(cart.into())
    }
}

/// Locks the customer's cart, starting an empty one for known customers.
pub(crate) async fn load_or_create(conn: &mut PgConnection, customer_id: &str) -> Result<Cart> {
    if let Some(cart) = carts::find_for_update(&mut *conn, customer_id).await? {
        return Ok(cart);
    }
    if customers::find(&mut *conn, customer_id).await?.is_none() {
        return Err(EcommerceError::CustomerNotFound(customer_id.to_string()));
    }
    Ok(Cart::for_customer(customer_id))
}

fn ensure_stock(product: &Product, units: u32) -> Result<()> {
    let available = product.stock().value();
    if units > available {
        let sku = product.sku().to_string();
        return Err(ProductError::InsufficientInventory { sku, requested: units, available }.into());
    }
    Ok(())
}

/// Re-applies current catalog prices and promotions to every line.
pub(crate) async fn refresh_prices(conn: &mut PgConnection, cart: &mut Cart) -> Result<()> {
    if cart.is_empty() { return Ok(()); }
    let targeted = promotions::targeted(&mut *conn).await?;
    let now = Utc::now();
    let skus: Vec<Sku> = cart.items().iter().map(|i| i.sku.clone()).collect();
    for sku in skus {
        if let Some(product) = products::find(&mut *conn, &sku).await? {
            let priced = pricing::price_product(&product, &targeted, now);
            cart.reprice(&sku, priced.original_price, priced.promotion);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_cart_view_subtotal_counts_selected_lines() {
        let mut cart = Cart::for_customer("KH1");
        let line = |sku: &str, selected| CartItem {
            sku: Sku::new(sku).unwrap(),
            name: sku.into(),
            quantity: 2,
            unit_price: Money::vnd(Decimal::new(50_000, 0)),
            selected,
            promotion: None,
        };
        cart.add_item(line("A", true)).unwrap();
        cart.add_item(line("B", false)).unwrap();
        let view = CartView::from(cart);
        assert_eq!(view.subtotal.amount(), Decimal::new(100_000, 0));
    }

    #[test]
    fn test_stock_check_counts_requested_units() {
        use crate::domain::aggregates::ProductDetails;
        let details = ProductDetails { name: "Serum".into(), category: "Skincare".into(), ..Default::default() };
        let mut product = Product::create(Sku::new("SRM-01").unwrap(), details, Money::vnd(Decimal::new(100_000, 0)));
        product.add_inventory(5);
        assert!(ensure_stock(&product, 5).is_ok());
        assert!(matches!(
            ensure_stock(&product, 6),
            Err(EcommerceError::Product(ProductError::InsufficientInventory { requested: 6, available: 5, .. }))
        ));
    }

    #[test]
    fn test_add_item_quantity_bounds() {
        assert!(AddItemRequest { sku: "A".into(), quantity: 0 }.validate().is_err());
        assert!(AddItemRequest { sku: "A".into(), quantity: 3 }.validate().is_ok());
        assert!(UpdateItemRequest { quantity: Some(1000), selected: None }.validate().is_err());
    }
}
