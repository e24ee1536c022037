//! Order persistence.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgExecutor;

use super::corrupt;
use crate::domain::aggregates::{
    InvoiceInfo, NewOrder, Order, OrderItem, OrderRecord, OrderStatus, PricingBreakdown, ShippingInfo,
};
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: String,
    customer_id: String,
    shipping_info: Json<ShippingInfo>,
    items: Json<Vec<OrderItem>>,
    promotion_code: Option<String>,
    pricing: Json<PricingBreakdown>,
    invoice: Option<Json<InvoiceInfo>>,
    payment_method: String,
    status: String,
    routes: Json<BTreeMap<OrderStatus, DateTime<Utc>>>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = crate::EcommerceError;

    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order::restore(OrderRecord {
            order: NewOrder {
                order_id: r.order_id,
                customer_id: r.customer_id,
                shipping_info: r.shipping_info.0,
                items: r.items.0,
                promotion_code: r.promotion_code,
                pricing: r.pricing.0,
                invoice: r.invoice.map(|j| j.0),
                payment_method: r.payment_method.parse().map_err(|e| corrupt("payment_method", e))?,
                note: r.note,
            },
            status: r.status.parse().map_err(|e| corrupt("status", e))?,
            routes: r.routes.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }
}

pub async fn find<'e>(db: impl PgExecutor<'e>, order_id: &str) -> Result<Option<Order>> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(db)
        .await?
        .map(Order::try_from)
        .transpose()
}

pub async fn find_for_update<'e>(db: impl PgExecutor<'e>, order_id: &str) -> Result<Option<Order>> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE order_id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(db)
        .await?
        .map(Order::try_from)
        .transpose()
}

/// Orders of one customer, newest first. `status` narrows to a single status.
pub async fn list_for_customer<'e>(db: impl PgExecutor<'e>, customer_id: &str, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE customer_id = $1 AND ($2::text IS NULL OR status = $2) ORDER BY created_at DESC",
    )
    .bind(customer_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(db)
    .await?
    .into_iter()
    .map(Order::try_from)
    .collect()
}

pub async fn list_all<'e>(db: impl PgExecutor<'e>) -> Result<Vec<Order>> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at")
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Order::try_from)
        .collect()
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, o: &Order) -> Result<()> {
    sqlx::query(
        "INSERT INTO orders (order_id, customer_id, shipping_info, items, promotion_code, pricing, invoice, \
         payment_method, status, routes, note, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(o.order_id())
    .bind(o.customer_id())
    .bind(Json(o.shipping_info()))
    .bind(Json(o.items()))
    .bind(o.promotion_code())
    .bind(Json(o.pricing()))
    .bind(o.invoice().map(Json))
    .bind(o.payment_method().as_str())
    .bind(o.status().as_str())
    .bind(Json(o.routes()))
    .bind(o.note())
    .bind(o.created_at())
    .bind(o.updated_at())
    .execute(db)
    .await?;
    Ok(())
}

/// Persists the mutable parts of an order: items (review flags), status, routes and note.
pub async fn update<'e>(db: impl PgExecutor<'e>, o: &Order) -> Result<()> {
    sqlx::query("UPDATE orders SET items = $2, status = $3, routes = $4, note = $5, updated_at = $6 WHERE order_id = $1")
        .bind(o.order_id())
        .bind(Json(o.items()))
        .bind(o.status().as_str())
        .bind(Json(o.routes()))
        .bind(o.note())
        .bind(o.updated_at())
        .execute(db)
        .await?;
    Ok(())
}
