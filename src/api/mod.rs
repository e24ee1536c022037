//! HTTP surface.

mod accounts;
mod admin;
mod carts;
mod catalog;
mod orders;
mod promotions;
mod reviews;

use axum::{routing::{get, patch, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::application::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/auth/register", post(accounts::register))
        .route("/api/v1/auth/login", post(accounts::login))
        .route("/api/v1/customers/:id", get(accounts::profile))
        .route("/api/v1/customers/:id/password", put(accounts::change_password))
        .route("/api/v1/customers/:id/tier", post(admin::recompute_tier))
        .route("/api/v1/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/api/v1/products/:sku",
            get(catalog::get_product).put(catalog::update_product).delete(catalog::archive_product),
        )
        .route("/api/v1/carts/:customer_id", get(carts::get_cart).delete(carts::clear_cart))
        .route("/api/v1/carts/:customer_id/items", post(carts::add_item))
        .route("/api/v1/carts/:customer_id/items/:sku", patch(carts::update_item).delete(carts::remove_item))
        .route("/api/v1/carts/:customer_id/selection", put(carts::select_all))
        .route("/api/v1/orders/quote", post(orders::quote))
        .route("/api/v1/orders", get(orders::list_orders).post(orders::checkout))
        .route("/api/v1/orders/:order_id", get(orders::get_order))
        .route("/api/v1/orders/:order_id/status", put(orders::update_status))
        .route("/api/v1/orders/:order_id/cancel", post(orders::cancel))
        .route("/api/v1/orders/:order_id/return", post(orders::request_return))
        .route("/api/v1/promotions", get(promotions::list_promotions).post(promotions::create_promotion))
        .route("/api/v1/promotions/validate", post(promotions::validate_code))
        .route(
            "/api/v1/promotions/:id",
            get(promotions::get_promotion).put(promotions::update_promotion).delete(promotions::deactivate_promotion),
        )
        .route("/api/v1/promotions/:id/targets", put(promotions::replace_targets))
        .route("/api/v1/reviews/:sku", get(reviews::list_reviews).post(reviews::add_review))
        .route("/api/v1/reviews/:sku/:review_id/like", post(reviews::toggle_like))
        .route("/api/v1/reviews/:sku/:review_id/replies", post(reviews::reply))
        .route("/api/v1/admin/tiers", post(admin::recompute_all_tiers))
        .route("/api/v1/admin/backup", post(admin::backup))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
}
