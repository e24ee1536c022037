//! Storefront backend
//!
//! REST backend for a single-currency (VND) online store.
//!
//! ## Features
//! - Product catalog with promotion-adjusted prices
//! - Per-customer carts with line selection
//! - Checkout, order lifecycle and restocking
//! - Promotions (percent / fixed / buy1get1) with usage limits and targets
//! - Product reviews and ratings
//! - Customer accounts and loyalty tiers
//! - JSON backup of every collection

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use thiserror::Error;

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use domain::aggregates::{CartError, CustomerError, OrderError, ProductError, PromotionError, ReviewError};
use domain::value_objects::{PhoneError, RatingError, SkuError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Promotion not found: {0}")]
    PromotionNotFound(String),

    #[error("Invalid phone or password")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Promotion(#[from] PromotionError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Customer(#[from] CustomerError),

    #[error(transparent)]
    Sku(#[from] SkuError),

    #[error(transparent)]
    Phone(#[from] PhoneError),

    #[error(transparent)]
    Rating(#[from] RatingError),

    #[error("Storage error: {0}")]
    StorageError(#[from] sqlx::Error),

    #[error("Corrupt stored data: {0}")]
    DataCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing failed")]
    PasswordHash,
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl EcommerceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ProductNotFound(_) | Self::OrderNotFound(_) | Self::CustomerNotFound(_) | Self::PromotionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Cart(CartError::ItemNotFound(_)) | Self::Review(ReviewError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_)
            | Self::Order(OrderError::InvalidTransition { .. } | OrderError::AlreadyReviewed(_))
            | Self::Review(ReviewError::Duplicate { .. })
            | Self::Product(ProductError::InsufficientInventory { .. }) => StatusCode::CONFLICT,
            Self::Promotion(
                PromotionError::Inactive(_)
                | PromotionError::NotStarted(_)
                | PromotionError::Expired(_)
                | PromotionError::UsageExhausted(_)
                | PromotionError::BelowMinimum { .. }
                | PromotionError::NotRedeemable(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Validation(_)
            | Self::Product(_)
            | Self::Order(_)
            | Self::Cart(_)
            | Self::Promotion(_)
            | Self::Review(_)
            | Self::Customer(_)
            | Self::Sku(_)
            | Self::Phone(_)
            | Self::Rating(_) => StatusCode::BAD_REQUEST,
            Self::StorageError(_)
            | Self::DataCorruption(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::aggregates::OrderStatus;

    #[test]
    fn test_error_display() {
        let err = EcommerceError::ProductNotFound("SKU-1".to_string());
        assert_eq!(err.to_string(), "Product not found: SKU-1");
        let err = EcommerceError::from(OrderError::NoItems);
        assert_eq!(err.to_string(), "Order has no purchased items");
    }

    #[test]
    fn test_error_status_codes() {
        let status = |e: EcommerceError| e.into_response().status();
        assert_eq!(status(EcommerceError::OrderNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(EcommerceError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(OrderError::InvalidTransition { from: OrderStatus::Pending, to: OrderStatus::Completed }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(status(PromotionError::Expired("X".into()).into()), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(PromotionError::Invalid("bad".into()).into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(EcommerceError::PasswordHash), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(CartError::ItemNotFound("A".into()).into()), StatusCode::NOT_FOUND);
    }
}
