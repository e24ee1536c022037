//! Customer persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;

use super::{corrupt, to_db_int, to_u32, unique_conflict};
use crate::domain::aggregates::{Customer, CustomerRecord};
use crate::domain::value_objects::{Money, Phone};
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    customer_id: String,
    phone: String,
    full_name: String,
    email: Option<String>,
    password_hash: String,
    password_version: i32,
    total_spent: Decimal,
    tier: String,
    groups: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = crate::EcommerceError;

    fn try_from(r: CustomerRow) -> Result<Self> {
        Ok(Customer::restore(CustomerRecord {
            customer_id: r.customer_id,
            phone: Phone::parse(r.phone).map_err(|e| corrupt("phone", e))?,
            full_name: r.full_name,
            email: r.email,
            password_hash: r.password_hash,
            password_version: to_u32(r.password_version, "password_version")?,
            total_spent: Money::vnd(r.total_spent),
            tier: r.tier.parse().map_err(|e| corrupt("tier", e))?,
            groups: r.groups,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }
}

pub async fn find<'e>(db: impl PgExecutor<'e>, customer_id: &str) -> Result<Option<Customer>> {
    sqlx::query_as::<_, CustomerRow>("SELECT * FROM customers WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(db)
        .await?
        .map(Customer::try_from)
        .transpose()
}

pub async fn find_for_update<'e>(db: impl PgExecutor<'e>, customer_id: &str) -> Result<Option<Customer>> {
    sqlx::query_as::<_, CustomerRow>("SELECT * FROM customers WHERE customer_id = $1 FOR UPDATE")
        .bind(customer_id)
        .fetch_optional(db)
        .await?
        .map(Customer::try_from)
        .transpose()
}

pub async fn find_by_phone<'e>(db: impl PgExecutor<'e>, phone: &Phone) -> Result<Option<Customer>> {
    sqlx::query_as::<_, CustomerRow>("SELECT * FROM customers WHERE phone = $1")
        .bind(phone.as_str())
        .fetch_optional(db)
        .await?
        .map(Customer::try_from)
        .transpose()
}

pub async fn list_ids<'e>(db: impl PgExecutor<'e>) -> Result<Vec<String>> {
    Ok(sqlx::query_scalar::<_, String>("SELECT customer_id FROM customers ORDER BY customer_id")
        .fetch_all(db)
        .await?)
}

pub async fn list_all<'e>(db: impl PgExecutor<'e>) -> Result<Vec<Customer>> {
    sqlx::query_as::<_, CustomerRow>("SELECT * FROM customers ORDER BY customer_id")
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Customer::try_from)
        .collect()
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, c: &Customer) -> Result<()> {
    sqlx::query(
        "INSERT INTO customers (customer_id, phone, full_name, email, password_hash, password_version, \
         total_spent, tier, groups, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(c.customer_id())
    .bind(c.phone().as_str())
    .bind(c.full_name())
    .bind(c.email())
    .bind(c.password_hash())
    .bind(to_db_int(c.password_version(), "password_version")?)
    .bind(c.total_spent().amount())
    .bind(c.tier().label())
    .bind(c.groups())
    .bind(c.created_at())
    .bind(c.updated_at())
    .execute(db)
    .await
    .map_err(|e| unique_conflict(e, || format!("phone {} is already registered", c.phone().as_str())))?;
    Ok(())
}

pub async fn update<'e>(db: impl PgExecutor<'e>, c: &Customer) -> Result<()> {
    sqlx::query(
        "UPDATE customers SET full_name = $2, email = $3, password_hash = $4, password_version = $5, \
         total_spent = $6, tier = $7, groups = $8, updated_at = $9 WHERE customer_id = $1",
    )
    .bind(c.customer_id())
    .bind(c.full_name())
    .bind(c.email())
    .bind(c.password_hash())
    .bind(to_db_int(c.password_version(), "password_version")?)
    .bind(c.total_spent().amount())
    .bind(c.tier().label())
    .bind(c.groups())
    .bind(c.updated_at())
    .execute(db)
    .await?;
    Ok(())
}
