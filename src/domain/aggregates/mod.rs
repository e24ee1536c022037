//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod promotion;
pub mod review;
pub mod customer;

pub use product::{Product, ProductDetails, ProductError, ProductRecord, ProductStatus};
pub use order::{
    InvoiceInfo, ItemType, NewOrder, Order, OrderError, OrderItem, OrderRecord, OrderStatus, PaymentMethod,
    PricingBreakdown, ShippingInfo,
};
pub use cart::{Cart, CartError, CartItem};
pub use promotion::{
    DiscountType, Promotion, PromotionError, PromotionScope, PromotionSnapshot, PromotionTarget, PromotionTerms, TargetType,
};
pub use review::{NewReview, ProductReviews, ReviewEntry, ReviewError, ReviewReply};
pub use customer::{Customer, CustomerError, CustomerRecord, CustomerTier};
