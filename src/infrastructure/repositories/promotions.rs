//! Promotion and promotion target persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor};

use super::{corrupt, to_db_int, to_u32, unique_conflict};
use crate::domain::aggregates::{Promotion, PromotionTarget};
use crate::domain::services::pricing::TargetedPromotion;
use crate::domain::value_objects::Money;
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    promotion_id: String,
    code: String,
    name: String,
    description: String,
    discount_type: String,
    discount_value: Decimal,
    max_discount: Option<Decimal>,
    scope: String,
    min_order_value: Decimal,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    usage_limit: Option<i32>,
    usage_count: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = crate::EcommerceError;

    fn try_from(r: PromotionRow) -> Result<Self> {
        Ok(Promotion {
            promotion_id: r.promotion_id,
            code: r.code,
            name: r.name,
            description: r.description,
            discount_type: r.discount_type.parse().map_err(|e| corrupt("discount_type", e))?,
            discount_value: r.discount_value,
            max_discount: r.max_discount.map(Money::vnd),
            scope: r.scope.parse().map_err(|e| corrupt("scope", e))?,
            min_order_value: Money::vnd(r.min_order_value),
            start_date: r.start_date,
            end_date: r.end_date,
            usage_limit: r.usage_limit.map(|l| to_u32(l, "usage_limit")).transpose()?,
            usage_count: to_u32(r.usage_count, "usage_count")?,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TargetRow {
    promotion_id: String,
    target_type: String,
    target_ref: Json<Vec<String>>,
}

impl TryFrom<TargetRow> for PromotionTarget {
    type Error = crate::EcommerceError;

    fn try_from(r: TargetRow) -> Result<Self> {
        Ok(PromotionTarget {
            promotion_id: r.promotion_id,
            target_type: r.target_type.parse().map_err(|e| corrupt("target_type", e))?,
            target_ref: r.target_ref.0,
        })
    }
}

pub async fn find<'e>(db: impl PgExecutor<'e>, promotion_id: &str) -> Result<Option<Promotion>> {
    sqlx::query_as::<_, PromotionRow>("SELECT * FROM promotions WHERE promotion_id = $1")
        .bind(promotion_id)
        .fetch_optional(db)
        .await?
        .map(Promotion::try_from)
        .transpose()
}

pub async fn find_for_update<'e>(db: impl PgExecutor<'e>, promotion_id: &str) -> Result<Option<Promotion>> {
    sqlx::query_as::<_, PromotionRow>("SELECT * FROM promotions WHERE promotion_id = $1 FOR UPDATE")
        .bind(promotion_id)
        .fetch_optional(db)
        .await?
        .map(Promotion::try_from)
        .transpose()
}

pub async fn find_by_code<'e>(db: impl PgExecutor<'e>, code: &str) -> Result<Option<Promotion>> {
    sqlx::query_as::<_, PromotionRow>("SELECT * FROM promotions WHERE code = UPPER($1)")
        .bind(code.trim())
        .fetch_optional(db)
        .await?
        .map(Promotion::try_from)
        .transpose()
}

pub async fn find_by_code_for_update<'e>(db: impl PgExecutor<'e>, code: &str) -> Result<Option<Promotion>> {
    sqlx::query_as::<_, PromotionRow>("SELECT * FROM promotions WHERE code = UPPER($1) FOR UPDATE")
        .bind(code.trim())
        .fetch_optional(db)
        .await?
        .map(Promotion::try_from)
        .transpose()
}

pub async fn list<'e>(db: impl PgExecutor<'e>, include_inactive: bool) -> Result<Vec<Promotion>> {
    sqlx::query_as::<_, PromotionRow>("SELECT * FROM promotions WHERE is_active OR $1 ORDER BY start_date DESC")
        .bind(include_inactive)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Promotion::try_from)
        .collect()
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, p: &Promotion) -> Result<()> {
    sqlx::query(
        "INSERT INTO promotions (promotion_id, code, name, description, discount_type, discount_value, \
         max_discount, scope, min_order_value, start_date, end_date, usage_limit, usage_count, is_active, \
         created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(&p.promotion_id)
    .bind(&p.code)
    .bind(&p.name)
    .bind(&p.description)
    .bind(p.discount_type.as_str())
    .bind(p.discount_value)
    .bind(p.max_discount.as_ref().map(Money::amount))
    .bind(p.scope.as_str())
    .bind(p.min_order_value.amount())
    .bind(p.start_date)
    .bind(p.end_date)
    .bind(p.usage_limit.map(|v| to_db_int(v, "usage_limit")).transpose()?)
    .bind(to_db_int(p.usage_count, "usage_count")?)
    .bind(p.is_active)
    .bind(p.created_at)
    .bind(p.updated_at)
    .execute(db)
    .await
    .map_err(|e| unique_conflict(e, || format!("promotion code {} already exists", p.code)))?;
    Ok(())
}

pub async fn update<'e>(db: impl PgExecutor<'e>, p: &Promotion) -> Result<()> {
    sqlx::query(
        "UPDATE promotions SET code = $2, name = $3, description = $4, discount_type = $5, discount_value = $6, \
         max_discount = $7, scope = $8, min_order_value = $9, start_date = $10, end_date = $11, \
         usage_limit = $12, usage_count = $13, is_active = $14, updated_at = $15 WHERE promotion_id = $1",
    )
    .bind(&p.promotion_id)
    .bind(&p.code)
    .bind(&p.name)
    .bind(&p.description)
    .bind(p.discount_type.as_str())
    .bind(p.discount_value)
    .bind(p.max_discount.as_ref().map(Money::amount))
    .bind(p.scope.as_str())
    .bind(p.min_order_value.amount())
    .bind(p.start_date)
    .bind(p.end_date)
    .bind(p.usage_limit.map(|v| to_db_int(v, "usage_limit")).transpose()?)
    .bind(to_db_int(p.usage_count, "usage_count")?)
    .bind(p.is_active)
    .bind(p.updated_at)
    .execute(db)
    .await
    .map_err(|e| unique_conflict(e, || format!("promotion code {} already exists", p.code)))?;
    Ok(())
}

pub async fn targets_for<'e>(db: impl PgExecutor<'e>, promotion_id: &str) -> Result<Vec<PromotionTarget>> {
    sqlx::query_as::<_, TargetRow>("SELECT * FROM promotion_targets WHERE promotion_id = $1 ORDER BY target_type")
        .bind(promotion_id)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(PromotionTarget::try_from)
        .collect()
}

pub async fn list_all_targets<'e>(db: impl PgExecutor<'e>) -> Result<Vec<PromotionTarget>> {
    sqlx::query_as::<_, TargetRow>("SELECT * FROM promotion_targets ORDER BY promotion_id, target_type")
        .fetch_all(db)
        .await?
        .into_iter()
        .map(PromotionTarget::try_from)
        .collect()
}

/// Replaces every target of a promotion. Run inside a transaction.
pub async fn replace_targets(conn: &mut PgConnection, promotion_id: &str, targets: &[PromotionTarget]) -> Result<()> {
    sqlx::query("DELETE FROM promotion_targets WHERE promotion_id = $1")
        .bind(promotion_id)
        .execute(&mut *conn)
        .await?;
    for target in targets {
        sqlx::query(
            "INSERT INTO promotion_targets (promotion_id, target_type, target_ref) VALUES ($1, $2, $3) \
             ON CONFLICT (promotion_id, target_type) \
             DO UPDATE SET target_ref = promotion_targets.target_ref || EXCLUDED.target_ref",
        )
        .bind(promotion_id)
        .bind(target.target_type.as_str())
        .bind(Json(&target.target_ref))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Active product-scoped promotions with their targets, for catalog pricing.
pub async fn targeted(conn: &mut PgConnection) -> Result<Vec<TargetedPromotion>> {
    let promotions = sqlx::query_as::<_, PromotionRow>(
        "SELECT * FROM promotions WHERE is_active AND scope IN ('category', 'product', 'brand') \
         AND start_date <= NOW() AND end_date >= NOW()",
    )
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(Promotion::try_from)
    .collect::<Result<Vec<_>>>()?;

    let mut targets: HashMap<String, Vec<PromotionTarget>> = HashMap::new();
    for target in list_all_targets(&mut *conn).await? {
        targets.entry(target.promotion_id.clone()).or_default().push(target);
    }

    Ok(promotions
        .into_iter()
        .map(|promotion| {
            let targets = targets.remove(&promotion.promotion_id).unwrap_or_default();
            TargetedPromotion { promotion, targets }
        })
        .collect())
}
