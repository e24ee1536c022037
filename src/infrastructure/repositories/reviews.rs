//! Review document persistence, one row per SKU.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgExecutor;

use super::corrupt;
use crate::domain::aggregates::{ProductReviews, ReviewEntry};
use crate::domain::value_objects::Sku;
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct ReviewsRow {
    sku: String,
    reviews: Json<Vec<ReviewEntry>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewsRow> for ProductReviews {
    type Error = crate::EcommerceError;

    fn try_from(r: ReviewsRow) -> Result<Self> {
        let sku = Sku::new(r.sku).map_err(|e| corrupt("sku", e))?;
        Ok(ProductReviews::restore(sku, r.reviews.0, r.updated_at))
    }
}

pub async fn find<'e>(db: impl PgExecutor<'e>, sku: &Sku) -> Result<Option<ProductReviews>> {
    sqlx::query_as::<_, ReviewsRow>("SELECT * FROM reviews WHERE sku = $1")
        .bind(sku.as_str())
        .fetch_optional(db)
        .await?
        .map(ProductReviews::try_from)
        .transpose()
}

pub async fn find_for_update<'e>(db: impl PgExecutor<'e>, sku: &Sku) -> Result<Option<ProductReviews>> {
    sqlx::query_as::<_, ReviewsRow>("SELECT * FROM reviews WHERE sku = $1 FOR UPDATE")
        .bind(sku.as_str())
        .fetch_optional(db)
        .await?
        .map(ProductReviews::try_from)
        .transpose()
}

pub async fn list_all<'e>(db: impl PgExecutor<'e>) -> Result<Vec<ProductReviews>> {
    sqlx::query_as::<_, ReviewsRow>("SELECT * FROM reviews ORDER BY sku")
        .fetch_all(db)
        .await?
        .into_iter()
        .map(ProductReviews::try_from)
        .collect()
}

pub async fn save<'e>(db: impl PgExecutor<'e>, doc: &ProductReviews) -> Result<()> {
    sqlx::query(
        "INSERT INTO reviews (sku, reviews, updated_at) VALUES ($1, $2, $3) \
         ON CONFLICT (sku) DO UPDATE SET reviews = EXCLUDED.reviews, updated_at = EXCLUDED.updated_at",
    )
    .bind(doc.sku().as_str())
    .bind(Json(doc.reviews()))
    .bind(doc.updated_at())
    .execute(db)
    .await?;
    Ok(())
}
