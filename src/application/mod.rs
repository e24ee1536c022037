//! Application services.
//!
//! Each service loads aggregates through the repositories, applies the
//! domain rules, persists the result (inside one transaction when several
//! rows change) and publishes the raised domain events after commit.

pub mod accounts;
pub mod backup;
pub mod carts;
pub mod catalog;
pub mod orders;
pub mod promotions;
pub mod reviews;
pub mod tiering;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::infrastructure::events::EventPublisher;

/// Application state shared across handlers and services.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pool: PgPool,
    events: EventPublisher,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool, events: EventPublisher) -> Self {
        Self { inner: Arc::new(AppStateInner { config, pool, events }) }
    }

    pub fn config(&self) -> &Config { &self.inner.config }
    pub fn pool(&self) -> &PgPool { &self.inner.pool }
    pub fn events(&self) -> &EventPublisher { &self.inner.events }
}

/// Page request shared by list operations. `per_page` is capped at 100.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct Page {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Page {
    pub fn number(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn size(&self) -> u32 { self.per_page.unwrap_or(20).clamp(1, 100) }
    pub fn offset(&self) -> i64 { i64::from(self.number() - 1) * i64::from(self.size()) }
}

#[derive(Debug, serde::Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let p = Page { page: None, per_page: Some(500) };
        assert_eq!((p.number(), p.size(), p.offset()), (1, 100, 0));
        let p = Page { page: Some(3), per_page: Some(10) };
        assert_eq!(p.offset(), 20);
        let p = Page { page: Some(0), per_page: Some(0) };
        assert_eq!((p.number(), p.size()), (1, 1));
    }
}
