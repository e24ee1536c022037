//! Review Aggregate
//!
//! All reviews of one SKU live in a single document together with the
//! running average that is mirrored onto the product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, ReviewEvent};
use crate::domain::value_objects::{Rating, Sku};

#[derive(Clone, Debug, Serialize)]
pub struct ProductReviews {
    sku: Sku,
    reviews: Vec<ReviewEntry>,
    average_rating: f64,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub review_id: String,
    pub customer_id: String,
    pub order_id: String,
    pub rating: Rating,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub replies: Vec<ReviewReply>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewReply {
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A review as submitted by a customer.
#[derive(Clone, Debug)]
pub struct NewReview {
    pub customer_id: String,
    pub order_id: String,
    pub rating: Rating,
    pub content: String,
    pub images: Vec<String>,
}

impl ProductReviews {
    pub fn empty(sku: Sku) -> Self {
        Self { sku, reviews: vec![], average_rating: 0.0, updated_at: Utc::now(), events: vec![] }
    }

    pub fn restore(sku: Sku, reviews: Vec<ReviewEntry>, updated_at: DateTime<Utc>) -> Self {
        let mut doc = Self { sku, reviews, average_rating: 0.0, updated_at, events: vec![] };
        doc.average_rating = doc.compute_average();
        doc
    }

    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn reviews(&self) -> &[ReviewEntry] { &self.reviews }
    pub fn average_rating(&self) -> f64 { self.average_rating }
    pub fn count(&self) -> u32 { u32::try_from(self.reviews.len()).unwrap_or(u32::MAX) }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn add(&mut self, review: NewReview) -> Result<&ReviewEntry, ReviewError> {
        if self.reviews.iter().any(|r| r.customer_id == review.customer_id && r.order_id == review.order_id) {
            return Err(ReviewError::Duplicate { order_id: review.order_id });
        }
        if review.content.trim().is_empty() { return Err(ReviewError::EmptyContent); }
        let now = Utc::now();
        let entry = ReviewEntry {
            review_id: Uuid::new_v4().to_string(),
            customer_id: review.customer_id,
            order_id: review.order_id,
            rating: review.rating,
            content: review.content.trim().to_string(),
            images: review.images,
            likes: vec![],
            replies: vec![],
            created_at: now,
        };
        self.raise_event(DomainEvent::Review(ReviewEvent::Added {
            sku: self.sku.clone(), review_id: entry.review_id.clone(), rating: entry.rating.value(),
        }));
        self.reviews.push(entry);
        self.recalculate(now);
        Ok(&self.reviews[self.reviews.len() - 1])
    }

    /// Adds or removes `customer_id`'s like. Returns the new like count.
    pub fn toggle_like(&mut self, review_id: &str, customer_id: &str) -> Result<usize, ReviewError> {
        let entry = self.entry_mut(review_id)?;
        if let Some(pos) = entry.likes.iter().position(|c| c == customer_id) {
            entry.likes.remove(pos);
        } else {
            entry.likes.push(customer_id.to_string());
        }
        let likes = entry.likes.len();
        self.updated_at = Utc::now();
        Ok(likes)
    }

    pub fn reply(&mut self, review_id: &str, author_id: &str, content: &str) -> Result<(), ReviewError> {
        if content.trim().is_empty() { return Err(ReviewError::EmptyContent); }
        let now = Utc::now();
        self.entry_mut(review_id)?.replies.push(ReviewReply {
            author_id: author_id.to_string(), content: content.trim().to_string(), created_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    fn entry_mut(&mut self, review_id: &str) -> Result<&mut ReviewEntry, ReviewError> {
        self.reviews.iter_mut().find(|r| r.review_id == review_id).ok_or_else(|| ReviewError::NotFound(review_id.to_string()))
    }

    fn recalculate(&mut self, now: DateTime<Utc>) {
        self.average_rating = self.compute_average();
        self.updated_at = now;
    }

    /// Mean rating rounded to one decimal.
    fn compute_average(&self) -> f64 {
        if self.reviews.is_empty() { return 0.0; }
        let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating.value())).sum();
        let mean = f64::from(sum) / self.reviews.len() as f64;
        (mean * 10.0).round() / 10.0
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("Order {order_id} has already been reviewed for this product")]
    Duplicate { order_id: String },
    #[error("Review content must not be empty")]
    EmptyContent,
    #[error("Review {0} not found")]
    NotFound(String),
}
