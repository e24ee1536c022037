//! Customer tier recomputation.

use serde::Serialize;
use sqlx::PgConnection;

use super::AppState;
use crate::domain::aggregates::{Customer, OrderStatus};
use crate::domain::events::DomainEvent;
use crate::domain::services::tiering;
use crate::infrastructure::repositories::{customers, orders};
use crate::{EcommerceError, Result};

#[derive(Debug, Default, Serialize)]
pub struct TierRecomputeSummary {
    pub processed: usize,
    pub changed: usize,
}

pub struct TieringService<'a> {
    state: &'a AppState,
}

impl<'a> TieringService<'a> {
    pub fn new(state: &'a AppState) -> Self { Self { state } }

    pub async fn recompute(&self, customer_id: &str) -> Result<Customer> {
        let mut tx = self.state.pool().begin().await?;
        let (customer, events) = recompute_in(&mut tx, customer_id).await?;
        tx.commit().await?;
        self.state.events().publish_all(events).await;
        Ok(customer)
    }

    /// Re-derives TotalSpent and tier for every customer.
    pub async fn recompute_all(&self) -> Result<TierRecomputeSummary> {
        let ids = customers::list_ids(self.state.pool()).await?;
        let mut summary = TierRecomputeSummary::default();
        for id in ids {
            let before = customers::find(self.state.pool(), &id).await?.map(|c| c.tier());
            let customer = self.recompute(&id).await?;
            summary.processed += 1;
            if before != Some(customer.tier()) { summary.changed += 1; }
        }
        tracing::info!(processed = summary.processed, changed = summary.changed, "Customer tiers recomputed");
        Ok(summary)
    }
}

/// Recomputes one customer on an open connection or transaction.
pub(crate) async fn recompute_in(conn: &mut PgConnection, customer_id: &str) -> Result<(Customer, Vec<DomainEvent>)> {
    let mut customer = customers::find_for_update(&mut *conn, customer_id)
        .await?
        .ok_or_else(|| EcommerceError::CustomerNotFound(customer_id.to_string()))?;
    let completed = orders::list_for_customer(&mut *conn, customer_id, Some(OrderStatus::Completed)).await?;
    let spend = tiering::lifetime_spend(&completed);
    let from = customer.tier();
    if customer.apply_lifetime_spend(spend) {
        tracing::info!(customer_id, from = %from, to = %customer.tier(), "Customer tier changed");
    }
    customers::update(&mut *conn, &customer).await?;
    let events = customer.take_events();
    Ok((customer, events))
}
