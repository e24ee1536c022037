//! Product persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;

use super::{corrupt, to_db_int, to_u32, unique_conflict};
use crate::domain::aggregates::{Product, ProductDetails, ProductRecord};
use crate::domain::value_objects::{Money, Quantity, Sku};
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    sku: String,
    name: String,
    description: String,
    category: String,
    subcategory: Option<String>,
    brand: Option<String>,
    price: Decimal,
    stock: i32,
    rating: f64,
    review_count: i32,
    purchase_count: i32,
    images: Vec<String>,
    groups: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ListedProductRow {
    #[sqlx(flatten)]
    product: ProductRow,
    total_count: i64,
}

impl TryFrom<ProductRow> for Product {
    type Error = crate::EcommerceError;

    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product::restore(ProductRecord {
            sku: Sku::new(r.sku).map_err(|e| corrupt("sku", e))?,
            details: ProductDetails {
                name: r.name,
                description: r.description,
                category: r.category,
                subcategory: r.subcategory,
                brand: r.brand,
                images: r.images,
                groups: r.groups,
            },
            price: Money::vnd(r.price),
            stock: Quantity::new(to_u32(r.stock, "stock")?),
            rating: r.rating,
            review_count: to_u32(r.review_count, "review_count")?,
            purchase_count: to_u32(r.purchase_count, "purchase_count")?,
            status: r.status.parse().map_err(|e| corrupt("status", e))?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }
}

/// Catalog listing filters. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub include_inactive: bool,
    pub limit: i64,
    pub offset: i64,
}

pub async fn find<'e>(db: impl PgExecutor<'e>, sku: &Sku) -> Result<Option<Product>> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE sku = $1")
        .bind(sku.as_str())
        .fetch_optional(db)
        .await?
        .map(Product::try_from)
        .transpose()
}

pub async fn find_for_update<'e>(db: impl PgExecutor<'e>, sku: &Sku) -> Result<Option<Product>> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE sku = $1 FOR UPDATE")
        .bind(sku.as_str())
        .fetch_optional(db)
        .await?
        .map(Product::try_from)
        .transpose()
}

/// Returns one page of products and the total number of matches.
pub async fn list<'e>(db: impl PgExecutor<'e>, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
    let rows = sqlx::query_as::<_, ListedProductRow>(
        "SELECT *, COUNT(*) OVER () AS total_count FROM products \
         WHERE ($1::text IS NULL OR category = $1) \
           AND ($2::text IS NULL OR subcategory = $2) \
           AND ($3::text IS NULL OR brand = $3) \
           AND ($4::text IS NULL OR name ILIKE '%' || $4 || '%') \
           AND (status = 'active' OR $5) \
         ORDER BY purchase_count DESC, created_at DESC \
         LIMIT $6 OFFSET $7",
    )
    .bind(&filter.category)
    .bind(&filter.subcategory)
    .bind(&filter.brand)
    .bind(&filter.search)
    .bind(filter.include_inactive)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(db)
    .await?;

    let total = rows.first().map_or(0, |r| r.total_count);
    let products = rows.into_iter().map(|r| Product::try_from(r.product)).collect::<Result<Vec<_>>>()?;
    Ok((products, total))
}

pub async fn list_all<'e>(db: impl PgExecutor<'e>) -> Result<Vec<Product>> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products ORDER BY sku")
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, p: &Product) -> Result<()> {
    sqlx::query(
        "INSERT INTO products (sku, name, description, category, subcategory, brand, price, stock, rating, \
         review_count, purchase_count, images, groups, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(p.sku().as_str())
    .bind(p.name())
    .bind(p.description())
    .bind(p.category())
    .bind(p.subcategory())
    .bind(p.brand())
    .bind(p.price().amount())
    .bind(to_db_int(p.stock().value(), "stock")?)
    .bind(p.rating())
    .bind(to_db_int(p.review_count(), "review_count")?)
    .bind(to_db_int(p.purchase_count(), "purchase_count")?)
    .bind(p.images())
    .bind(p.groups())
    .bind(p.status().as_str())
    .bind(p.created_at())
    .bind(p.updated_at())
    .execute(db)
    .await
    .map_err(|e| unique_conflict(e, || format!("product {} already exists", p.sku())))?;
    Ok(())
}

pub async fn update<'e>(db: impl PgExecutor<'e>, p: &Product) -> Result<()> {
    sqlx::query(
        "UPDATE products SET name = $2, description = $3, category = $4, subcategory = $5, brand = $6, \
         price = $7, stock = $8, rating = $9, review_count = $10, purchase_count = $11, images = $12, \
         groups = $13, status = $14, updated_at = $15 WHERE sku = $1",
    )
    .bind(p.sku().as_str())
    .bind(p.name())
    .bind(p.description())
    .bind(p.category())
    .bind(p.subcategory())
    .bind(p.brand())
    .bind(p.price().amount())
    .bind(to_db_int(p.stock().value(), "stock")?)
    .bind(p.rating())
    .bind(to_db_int(p.review_count(), "review_count")?)
    .bind(to_db_int(p.purchase_count(), "purchase_count")?)
    .bind(p.images())
    .bind(p.groups())
    .bind(p.status().as_str())
    .bind(p.updated_at())
    .execute(db)
    .await?;
    Ok(())
}
