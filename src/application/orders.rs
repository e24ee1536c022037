//! Checkout and the order lifecycle.
//!
//! Checkout locks the cart, the ordered products and the redeemed promotions
//! inside one transaction, so stock, purchase counters, promotion usage,
//! the new order and the trimmed cart are committed together or not at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use validator::Validate;

use super::{carts as cart_service, tiering, AppState};
use crate::domain::aggregates::{
    CartError, CartItem, InvoiceInfo, ItemType, NewOrder, Order, OrderError, OrderItem, OrderStatus, PaymentMethod, PricingBreakdown,
    Product, ProductError, Promotion, ShippingInfo,
};
use crate::domain::events::DomainEvent;
use crate::domain::services::pricing;
use crate::domain::value_objects::{Money, Sku};
use crate::infrastructure::repositories::{carts, orders, products, promotions};
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1))]
    pub customer_id: String,
    pub promotion_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Quote {
    pub items: Vec<OrderItem>,
    pub pricing: PricingBreakdown,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1))]
    pub customer_id: String,
    pub shipping_info: ShippingInfo,
    pub promotion_code: Option<String>,
    pub invoice: Option<InvoiceInfo>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub customer_id: String,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub reason: Option<String>,
}

/// A customer acting on their own order.
#[derive(Debug, Deserialize)]
pub struct CustomerActionRequest {
    pub customer_id: String,
    pub reason: Option<String>,
}

pub struct OrderService<'a> {
    state: &'a AppState,
}

impl<'a> OrderService<'a> {
    pub fn new(state: &'a AppState) -> Self { Self { state } }

    /// Prices the current cart selection without placing an order.
    pub async fn quote(&self, req: QuoteRequest) -> Result<Quote> {
        req.validate()?;
        let mut tx = self.state.pool().begin().await?;
        let mut cart = cart_service::load_or_create(&mut tx, &req.customer_id).await?;
        cart_service::refresh_prices(&mut tx, &mut cart).await?;
        let selected: Vec<CartItem> = cart.selected_items().cloned().collect();
        if selected.is_empty() { return Err(CartError::NothingSelected.into()); }
        let items = pricing::order_lines(&selected);
        let promotion = match normalized_code(req.promotion_code.as_deref()) {
            Some(code) => Some(find_promotion(&mut tx, &code, false).await?),
            None => None,
        };
        let pricing = self.price(&items, promotion.as_ref())?;
        tx.rollback().await?;
        Ok(Quote { items, pricing })
    }

    pub async fn checkout(&self, req: CheckoutRequest) -> Result<Order> {
        req.validate()?;
        let now = Utc::now();
        let mut tx = self.state.pool().begin().await?;

        let mut cart = carts::find_for_update(&mut *tx, &req.customer_id)
            .await?
            .ok_or(CartError::NothingSelected)?;
        cart_service::refresh_prices(&mut tx, &mut cart).await?;
        let mut selected: Vec<CartItem> = cart.selected_items().cloned().collect();
        if selected.is_empty() { return Err(CartError::NothingSelected.into()); }
        // Lock products in a stable order so concurrent checkouts cannot deadlock.
        selected.sort_by(|a, b| a.sku.cmp(&b.sku));

        let mut touched = Vec::with_capacity(selected.len());
        for item in &selected {
            let mut product = lock_product(&mut tx, &item.sku).await?;
            if !product.is_purchasable() {
                return Err(ProductError::NotPurchasable(item.sku.to_string()).into());
            }
            product.remove_inventory(pricing::units_required(item.quantity, item.promotion.as_ref()))?;
            product.record_sale(item.quantity);
            touched.push(product);
        }
        redeem_line_promotions(&mut tx, &selected, now).await?;

        let items = pricing::order_lines(&selected);
        let mut promotion = match normalized_code(req.promotion_code.as_deref()) {
            Some(code) => Some(find_promotion(&mut tx, &code, true).await?),
            None => None,
        };
        let breakdown = self.price(&items, promotion.as_ref())?;
        if let Some(p) = promotion.as_mut() {
            p.record_usage(now)?;
            promotions::update(&mut *tx, p).await?;
        }

        let mut order = Order::place(NewOrder {
            order_id: new_order_id(),
            customer_id: req.customer_id.clone(),
            shipping_info: req.shipping_info,
            items,
            promotion_code: promotion.as_ref().map(|p| p.code.clone()),
            pricing: breakdown,
            invoice: req.invoice,
            payment_method: req.payment_method,
            note: req.note.filter(|n| !n.trim().is_empty()),
        })?;
        orders::insert(&mut *tx, &order).await?;
        for product in &touched {
            products::update(&mut *tx, product).await?;
        }
        cart.remove_selected();
        carts::save(&mut *tx, &cart).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = order.order_id(),
            customer_id = order.customer_id(),
            total = %order.total(),
            promotion = ?order.promotion_code(),
            "Order placed"
        );
        let mut events = order.take_events();
        for product in &mut touched { events.extend(product.take_events()); }
        self.state.events().publish_all(events).await;
        Ok(order)
    }

    pub async fn list(&self, query: OrderListQuery) -> Result<Vec<Order>> {
        orders::list_for_customer(self.state.pool(), &query.customer_id, query.status).await
    }

    pub async fn get(&self, order_id: &str) -> Result<Order> {
        orders::find(self.state.pool(), order_id)
            .await?
            .ok_or_else(|| EcommerceError::OrderNotFound(order_id.to_string()))
    }

    /// Moves an order along its lifecycle (back office).
    pub async fn update_status(&self, order_id: &str, req: UpdateStatusRequest) -> Result<Order> {
        self.change(order_id, None, |order| order.transition_to(req.status, req.reason)).await
    }

    /// Cancels outright while pending, otherwise files a cancel request.
    pub async fn cancel(&self, order_id: &str, req: CustomerActionRequest) -> Result<Order> {
        let reason = req.reason;
        self.change(order_id, Some(&req.customer_id), |order| order.cancel_by_customer(reason)).await
    }

    pub async fn request_return(&self, order_id: &str, req: CustomerActionRequest) -> Result<Order> {
        let reason = req.reason;
        self.change(order_id, Some(&req.customer_id), |order| order.request_return(reason)).await
    }

    async fn change(
        &self,
        order_id: &str,
        owner: Option<&str>,
        step: impl FnOnce(&mut Order) -> std::result::Result<(), OrderError>,
    ) -> Result<Order> {
        let mut tx = self.state.pool().begin().await?;
        let mut order = orders::find_for_update(&mut *tx, order_id)
            .await?
            .ok_or_else(|| EcommerceError::OrderNotFound(order_id.to_string()))?;
        if owner.is_some_and(|c| c != order.customer_id()) {
            return Err(EcommerceError::Forbidden(format!("order {order_id} belongs to another customer")));
        }
        let from = order.status();
        step(&mut order)?;
        orders::update(&mut *tx, &order).await?;
        let mut events = apply_side_effects(&mut tx, &order).await?;
        tx.commit().await?;

        tracing::info!(order_id, from = %from, to = %order.status(), "Order status changed");
        let mut published = order.take_events();
        published.append(&mut events);
        self.state.events().publish_all(published).await;
        Ok(order)
    }

    fn price(&self, items: &[OrderItem], promotion: Option<&Promotion>) -> Result<PricingBreakdown> {
        let pricing_config = &self.state.config().pricing;
        let subtotal = pricing::lines_subtotal(items);
        let shipping_fee = Money::vnd(pricing_config.shipping_fee);
        Ok(pricing::quote(&subtotal, &shipping_fee, promotion, pricing_config.vat_rate, Utc::now())?)
    }
}

/// Restocks when the order just ended in cancelled/returned and refreshes the
/// customer's tier once it completed. The order row must already be saved in
/// the same transaction so the completed total is counted.
pub(crate) async fn apply_side_effects(conn: &mut PgConnection, order: &Order) -> Result<Vec<DomainEvent>> {
    let mut events = Vec::new();
    if order.status().restocks() {
        for item in order.items() {
            let Some(mut product) = products::find_for_update(&mut *conn, &item.sku).await? else {
                tracing::warn!(order_id = order.order_id(), sku = %item.sku, "Product missing on restock");
                continue;
            };
            product.add_inventory(item.quantity);
            if item.item_type == ItemType::Purchased {
                product.revert_sale(item.quantity);
            }
            products::update(&mut *conn, &product).await?;
            events.extend(product.take_events());
        }
        tracing::info!(order_id = order.order_id(), status = %order.status(), "Order items restocked");
    }
    if order.status() == OrderStatus::Completed {
        let (_, tier_events) = tiering::recompute_in(conn, order.customer_id()).await?;
        events.extend(tier_events);
    }
    Ok(events)
}

/// Counts one use of every product-level promotion applied to the ordered
/// lines, rejecting the checkout once a promotion's usage limit is reached.
async fn redeem_line_promotions(conn: &mut PgConnection, items: &[CartItem], now: DateTime<Utc>) -> Result<()> {
    let mut promotion_ids: Vec<&str> = items.iter()
        .filter_map(|i| i.promotion.as_ref())
        .map(|p| p.promotion_id.as_str())
        .collect();
    promotion_ids.sort_unstable();
    promotion_ids.dedup();
    for promotion_id in promotion_ids {
        let mut promotion = promotions::find_for_update(&mut *conn, promotion_id)
            .await?
            .ok_or_else(|| EcommerceError::PromotionNotFound(promotion_id.to_string()))?;
        promotion.record_usage(now)?;
        promotions::update(&mut *conn, &promotion).await?;
    }
    Ok(())
}

async fn lock_product(conn: &mut PgConnection, sku: &Sku) -> Result<Product> {
    products::find_for_update(conn, sku)
        .await?
        .ok_or_else(|| EcommerceError::ProductNotFound(sku.to_string()))
}

async fn find_promotion(conn: &mut PgConnection, code: &str, for_update: bool) -> Result<Promotion> {
    let found = if for_update {
        promotions::find_by_code_for_update(conn, code).await?
    } else {
        promotions::find_by_code(conn, code).await?
    };
    found.ok_or_else(|| EcommerceError::PromotionNotFound(code.to_string()))
}

pub(crate) fn normalized_code(code: Option<&str>) -> Option<String> {
    code.map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty())
}

/// `DH` + date + six random digits, e.g. `DH240615042917`.
fn new_order_id() -> String {
    format!("DH{}{:06}", Utc::now().format("%y%m%d"), rand::random::<u32>() % 1_000_000)
}
