//! Product catalog with promotion-adjusted prices.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppState, Page, Paginated};
use crate::domain::aggregates::{Product, ProductDetails, PromotionSnapshot};
use crate::domain::services::pricing::{self, TargetedPromotion};
use crate::domain::value_objects::{Money, Sku};
use crate::infrastructure::repositories::products::{self, ProductFilter};
use crate::infrastructure::repositories::promotions;
use crate::{EcommerceError, Result};

/// A product as shown to shoppers, with its current price.
#[derive(Debug, Serialize)]
pub struct PricedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub final_price: Money,
    pub promotion: Option<PromotionSnapshot>,
}

impl PricedProduct {
    pub fn price(product: Product, promotions: &[TargetedPromotion]) -> Self {
        let priced = pricing::price_product(&product, promotions, Utc::now());
        Self { product, final_price: priced.final_price, promotion: priced.promotion }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    #[validate(range(max = 1_000_000_000))]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default = "default_publish")]
    pub publish: bool,
}

fn default_publish() -> bool { true }

impl ProductRequest {
    fn details(&self) -> ProductDetails {
        ProductDetails {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            category: self.category.trim().to_string(),
            subcategory: self.subcategory.clone().filter(|s| !s.trim().is_empty()),
            brand: self.brand.clone().filter(|s| !s.trim().is_empty()),
            images: self.images.clone(),
            groups: self.groups.clone(),
        }
    }

    fn checked_price(&self) -> Result<Money> {
        if self.price.is_sign_negative() {
            return Err(EcommerceError::Validation("price must not be negative".into()));
        }
        Ok(Money::vnd(self.price))
    }
}

pub struct CatalogService<'a> {
    state: &'a AppState,
}

impl<'a> CatalogService<'a> {
    pub fn new(state: &'a AppState) -> Self { Self { state } }

    pub async fn list(&self, query: ProductQuery) -> Result<Paginated<PricedProduct>> {
        let page = Page { page: query.page, per_page: query.per_page };
        let filter = ProductFilter {
            category: query.category,
            subcategory: query.subcategory,
            brand: query.brand,
            search: query.search.filter(|s| !s.trim().is_empty()),
            include_inactive: query.include_inactive,
            limit: i64::from(page.size()),
            offset: page.offset(),
        };
        let (found, total) = products::list(self.state.pool(), &filter).await?;
        let promotions = self.active_promotions().await?;
        Ok(Paginated {
            data: found.into_iter().map(|p| PricedProduct::price(p, &promotions)).collect(),
            total,
            page: page.number(),
            per_page: page.size(),
        })
    }

    pub async fn get(&self, sku: &str) -> Result<PricedProduct> {
        let sku = Sku::new(sku)?;
        let product = products::find(self.state.pool(), &sku)
            .await?
            .ok_or_else(|| EcommerceError::ProductNotFound(sku.to_string()))?;
        let promotions = self.active_promotions().await?;
        Ok(PricedProduct::price(product, &promotions))
    }

    pub async fn create(&self, req: ProductRequest) -> Result<Product> {
        req.validate()?;
        let sku = Sku::new(req.sku.as_str())?;
        let mut product = Product::create(sku, req.details(), req.checked_price()?);
        product.add_inventory(req.stock);
        if req.publish { product.publish()?; }
        products::insert(self.state.pool(), &product).await?;
        tracing::info!(sku = %product.sku(), status = product.status().as_str(), "Product created");
        self.state.events().publish_all(product.take_events()).await;
        Ok(product)
    }

    /// Replaces the editable attributes, price and stock of an existing product.
    pub async fn update(&self, sku: &str, req: ProductRequest) -> Result<Product> {
        req.validate()?;
        let sku = Sku::new(sku)?;
        let mut tx = self.state.pool().begin().await?;
        let mut product = products::find_for_update(&mut *tx, &sku)
            .await?
            .ok_or_else(|| EcommerceError::ProductNotFound(sku.to_string()))?;
        product.update_details(req.details())?;
        product.update_price(req.checked_price()?);
        product.set_inventory(req.stock);
        if req.publish { product.publish()?; }
        products::update(&mut *tx, &product).await?;
        tx.commit().await?;
        tracing::info!(sku = %product.sku(), "Product updated");
        self.state.events().publish_all(product.take_events()).await;
        Ok(product)
    }

    /// Soft delete: the product stays for order history but leaves the catalog.
    pub async fn archive(&self, sku: &str) -> Result<()> {
        let sku = Sku::new(sku)?;
        let mut tx = self.state.pool().begin().await?;
        let mut product = products::find_for_update(&mut *tx, &sku)
            .await?
            .ok_or_else(|| EcommerceError::ProductNotFound(sku.to_string()))?;
        product.archive();
        products::update(&mut *tx, &product).await?;
        tx.commit().await?;
        tracing::info!(sku = %product.sku(), "Product archived");
        self.state.events().publish_all(product.take_events()).await;
        Ok(())
    }

    pub async fn active_promotions(&self) -> Result<Vec<TargetedPromotion>> {
        let mut conn = self.state.pool().acquire().await?;
        promotions::targeted(&mut conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(stock: u32) -> ProductRequest {
        serde_json::from_value(serde_json::json!({
            "sku": "SRM-01", "name": "Serum", "category": "Skincare", "price": "250000", "stock": stock
        }))
        .unwrap()
    }

    #[test]
    fn test_product_request_caps_stock() {
        assert!(request(500).validate().is_ok());
        assert!(request(1_000_000_000).validate().is_ok());
        assert!(request(3_000_000_000).validate().is_err());
    }

    #[test]
    fn test_product_request_publishes_by_default() {
        assert!(request(1).publish);
    }
}
