//! Product reviews.
//!
//! The product row is locked before its review document so that concurrent
//! first reviews of a SKU are serialized.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::orders::apply_side_effects;
use super::AppState;
use crate::domain::aggregates::{NewReview, OrderError, OrderStatus, ProductReviews, ReviewEntry, ReviewError};
use crate::domain::value_objects::{Rating, Sku};
use crate::infrastructure::repositories::{orders, products, reviews};
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct AddReviewRequest {
    #[validate(length(min = 1))]
    pub customer_id: String,
    #[validate(length(min = 1))]
    pub order_id: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    #[serde(default)]
    #[validate(length(max = 6))]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LikeRequest {
    #[validate(length(min = 1))]
    pub customer_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplyRequest {
    #[validate(length(min = 1))]
    pub author_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct AddedReview {
    pub review: ReviewEntry,
    pub average_rating: f64,
    pub review_count: u32,
    /// Set when this review completed the order.
    pub order_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct LikeCount {
    pub review_id: String,
    pub likes: usize,
}

pub struct ReviewService<'a> {
    state: &'a AppState,
}

impl<'a> ReviewService<'a> {
    pub fn new(state: &'a AppState) -> Self { Self { state } }

    pub async fn list(&self, sku: &str) -> Result<ProductReviews> {
        let sku = Sku::new(sku)?;
        match reviews::find(self.state.pool(), &sku).await? {
            Some(doc) => Ok(doc),
            None if products::find(self.state.pool(), &sku).await?.is_some() => Ok(ProductReviews::empty(sku)),
            None => Err(EcommerceError::ProductNotFound(sku.to_string())),
        }
    }

    /// Records a review for a delivered or completed order and mirrors the new
    /// average onto the product. Reviewing the last purchased item of a
    /// delivered order completes it.
    pub async fn add(&self, sku: &str, req: AddReviewRequest) -> Result<AddedReview> {
        req.validate()?;
        let sku = Sku::new(sku)?;
        let rating = Rating::new(req.rating)?;
        let mut tx = self.state.pool().begin().await?;

        let mut order = orders::find_for_update(&mut *tx, &req.order_id)
            .await?
            .ok_or_else(|| EcommerceError::OrderNotFound(req.order_id.clone()))?;
        if order.customer_id() != req.customer_id {
            return Err(EcommerceError::Forbidden(format!("order {} belongs to another customer", req.order_id)));
        }
        if !order.contains_purchased(&sku) {
            return Err(OrderError::ItemNotInOrder(sku.to_string()).into());
        }
        let all_reviewed = order.mark_reviewed(&sku)?;

        let mut product = products::find_for_update(&mut *tx, &sku)
            .await?
            .ok_or_else(|| EcommerceError::ProductNotFound(sku.to_string()))?;
        let mut doc = reviews::find_for_update(&mut *tx, &sku).await?.unwrap_or_else(|| ProductReviews::empty(sku.clone()));
        let review = doc
            .add(NewReview {
                customer_id: req.customer_id.clone(),
                order_id: req.order_id.clone(),
                rating,
                content: req.content,
                images: req.images,
            })?
            .clone();
        product.set_rating(doc.average_rating(), doc.count());
        reviews::save(&mut *tx, &doc).await?;
        products::update(&mut *tx, &product).await?;

        let order_completed = all_reviewed && order.status() == OrderStatus::Delivered;
        let mut events = doc.take_events();
        if order_completed {
            order.complete()?;
            events.extend(order.take_events());
        }
        orders::update(&mut *tx, &order).await?;
        if order_completed {
            events.extend(apply_side_effects(&mut tx, &order).await?);
        }
        tx.commit().await?;

        tracing::info!(
            sku = %sku,
            order_id = order.order_id(),
            rating = rating.value(),
            average = doc.average_rating(),
            order_completed,
            "Review added"
        );
        self.state.events().publish_all(events).await;
        Ok(AddedReview { review, average_rating: doc.average_rating(), review_count: doc.count(), order_completed })
    }

    /// Likes a review, or removes the like if `customer_id` already gave one.
    pub async fn toggle_like(&self, sku: &str, review_id: &str, req: LikeRequest) -> Result<LikeCount> {
        req.validate()?;
        let sku = Sku::new(sku)?;
        let mut tx = self.state.pool().begin().await?;
        let mut doc = self.locked_doc(&mut tx, &sku, review_id).await?;
        let likes = doc.toggle_like(review_id, &req.customer_id)?;
        reviews::save(&mut *tx, &doc).await?;
        tx.commit().await?;
        Ok(LikeCount { review_id: review_id.to_string(), likes })
    }

    pub async fn reply(&self, sku: &str, review_id: &str, req: ReplyRequest) -> Result<ProductReviews> {
        req.validate()?;
        let sku = Sku::new(sku)?;
        let mut tx = self.state.pool().begin().await?;
        let mut doc = self.locked_doc(&mut tx, &sku, review_id).await?;
        doc.reply(review_id, &req.author_id, &req.content)?;
        reviews::save(&mut *tx, &doc).await?;
        tx.commit().await?;
        tracing::debug!(sku = %sku, review_id, author_id = %req.author_id, "Review reply added");
        Ok(doc)
    }

    async fn locked_doc(&self, conn: &mut sqlx::PgConnection, sku: &Sku, review_id: &str) -> Result<ProductReviews> {
        reviews::find_for_update(conn, sku)
            .await?
            .ok_or_else(|| ReviewError::NotFound(review_id.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_review_validation() {
        let req = |rating, content: &str| AddReviewRequest {
            customer_id: "KH1".into(),
            order_id: "DH1".into(),
            rating,
            content: content.into(),
            images: vec![],
        };
        assert!(req(0, "ok").validate().is_err());
        assert!(req(6, "ok").validate().is_err());
        assert!(req(5, "").validate().is_err());
        assert!(req(4, "Thấm nhanh, dễ chịu").validate().is_ok());
    }
}
