//! Cart persistence. One row per customer, line items as JSONB.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgExecutor;

use crate::domain::aggregates::{Cart, CartItem};
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    customer_id: String,
    items: Json<Vec<CartItem>>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(r: CartRow) -> Self { Cart::restore(r.customer_id, r.items.0, r.updated_at) }
}

pub async fn find<'e>(db: impl PgExecutor<'e>, customer_id: &str) -> Result<Option<Cart>> {
    Ok(sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(db)
        .await?
        .map(Cart::from))
}

pub async fn find_for_update<'e>(db: impl PgExecutor<'e>, customer_id: &str) -> Result<Option<Cart>> {
    Ok(sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE customer_id = $1 FOR UPDATE")
        .bind(customer_id)
        .fetch_optional(db)
        .await?
        .map(Cart::from))
}

pub async fn list_all<'e>(db: impl PgExecutor<'e>) -> Result<Vec<Cart>> {
    Ok(sqlx::query_as::<_, CartRow>("SELECT * FROM carts ORDER BY customer_id")
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Cart::from)
        .collect())
}

pub async fn save<'e>(db: impl PgExecutor<'e>, cart: &Cart) -> Result<()> {
    sqlx::query(
        "INSERT INTO carts (customer_id, items, updated_at) VALUES ($1, $2, $3) \
         ON CONFLICT (customer_id) DO UPDATE SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at",
    )
    .bind(cart.customer_id())
    .bind(Json(cart.items()))
    .bind(cart.updated_at())
    .execute(db)
    .await?;
    Ok(())
}
