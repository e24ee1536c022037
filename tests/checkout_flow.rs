//! Database-backed tests for checkout and the order lifecycle.
//!
//! These tests require the `test-postgres` feature. They support two modes:
//! - CI mode: set POSTGRES_HOST and POSTGRES_PORT to reach a running server
//! - Local mode: testcontainers starts a postgres container (requires docker)

#![cfg(feature = "test-postgres")]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use storefront::application::accounts::AccountService;
use storefront::application::carts::CartService;
use storefront::application::catalog::CatalogService;
use storefront::application::orders::{CustomerActionRequest, OrderListQuery, OrderService, UpdateStatusRequest};
use storefront::application::promotions::PromotionService;
use storefront::application::reviews::ReviewService;
use storefront::application::AppState;
use storefront::config::Config;
use storefront::domain::aggregates::{
    CustomerTier, ItemType, Order, OrderError, OrderStatus, ProductError, PromotionError,
};
use storefront::domain::value_objects::Money;
use storefront::infrastructure::{self, events::EventPublisher};
use storefront::EcommerceError;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

/// Holds the app state and optionally the container (for local mode).
/// The container must be kept alive for the duration of the test.
struct Store {
    state: AppState,
    _container: Option<testcontainers::ContainerAsync<Postgres>>,
}

async fn setup_store() -> Store {
    let (url, container) = match (std::env::var("POSTGRES_HOST"), std::env::var("POSTGRES_PORT")) {
        (Ok(host), Ok(port)) => (format!("postgres://postgres:postgres@{host}:{port}/postgres"), None),
        _ => {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            (format!("postgres://postgres:postgres@{host}:{port}/postgres"), Some(container))
        }
    };

    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(url.clone()),
        _ => None,
    })
    .unwrap();
    let pool = PgPoolOptions::new().max_connections(5).connect(&config.database_url).await.unwrap();
    infrastructure::run_migrations(&pool).await.unwrap();
    // CI mode shares one server between tests.
    sqlx::query(
        "TRUNCATE customers, products, carts, promotions, promotion_targets, orders, reviews RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    Store { state: AppState::new(config, pool, EventPublisher::default()), _container: container }
}

fn vnd(v: i64) -> Money { Money::vnd(Decimal::new(v, 0)) }

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> T { serde_json::from_value(value).unwrap() }

impl Store {
    async fn customer(&self, phone: &str) -> String {
        let customer = AccountService::new(&self.state)
            .register(from_json(json!({"phone": phone, "password": "matkhau123", "full_name": "Lê Minh"})))
            .await
            .unwrap();
        customer.customer_id().to_string()
    }

    async fn product(&self, sku: &str, price: i64, stock: u32) {
        CatalogService::new(&self.state)
            .create(from_json(json!({
                "sku": sku, "name": sku, "category": "Skincare", "brand": "Acme", "price": price.to_string(), "stock": stock
            })))
            .await
            .unwrap();
    }

    async fn stock_of(&self, sku: &str) -> (u32, u32) {
        let priced = CatalogService::new(&self.state).get(sku).await.unwrap();
        (priced.product.stock().value(), priced.product.purchase_count())
    }

    async fn add(&self, customer_id: &str, sku: &str, quantity: u32) -> Result<(), EcommerceError> {
        CartService::new(&self.state)
            .add_item(customer_id, from_json(json!({"sku": sku, "quantity": quantity})))
            .await
            .map(|_| ())
    }

    async fn checkout(&self, customer_id: &str) -> Result<Order, EcommerceError> {
        OrderService::new(&self.state)
            .checkout(from_json(json!({
                "customer_id": customer_id,
                "shipping_info": {"full_name": "Lê Minh", "phone": "0901234567", "address": "12 Lý Thường Kiệt", "city": "Hà Nội"}
            })))
            .await
    }

    async fn advance(&self, order_id: &str, path: &[OrderStatus]) -> Order {
        let orders = OrderService::new(&self.state);
        let mut order = None;
        for &status in path {
            order = Some(orders.update_status(order_id, UpdateStatusRequest { status, reason: None }).await.unwrap());
        }
        order.unwrap()
    }

    async fn product_promotion(&self, code: &str, discount_type: &str, value: i64, sku: &str, usage_limit: Option<u32>) {
        PromotionService::new(&self.state)
            .create(from_json(json!({
                "code": code,
                "name": code,
                "discount_type": discount_type,
                "discount_value": value.to_string(),
                "scope": "product",
                "start_date": Utc::now() - Duration::days(1),
                "end_date": Utc::now() + Duration::days(7),
                "usage_limit": usage_limit,
                "targets": [{"target_type": "product", "target_ref": [sku]}]
            })))
            .await
            .unwrap();
    }
}

const TO_DELIVERED: [OrderStatus; 3] = [OrderStatus::Confirmed, OrderStatus::Shipping, OrderStatus::Delivered];

#[tokio::test]
async fn completing_an_order_counts_it_towards_the_tier() {
    let store = setup_store().await;
    let customer_id = store.customer("0901000001").await;
    store.product("SRM-01", 6_000_000, 5).await;
    store.add(&customer_id, "SRM-01", 1).await.unwrap();
    let order = store.checkout(&customer_id).await.unwrap();
    assert_eq!(order.total(), &vnd(6_510_000));

    let mut path = TO_DELIVERED.to_vec();
    path.push(OrderStatus::Completed);
    let order = store.advance(order.order_id(), &path).await;
    assert_eq!(order.status(), OrderStatus::Completed);

    let customer = AccountService::new(&store.state).profile(&customer_id).await.unwrap();
    assert_eq!(customer.total_spent(), &vnd(6_510_000));
    assert_eq!(customer.tier(), CustomerTier::Silver);
}

#[tokio::test]
async fn reviewing_every_item_completes_a_delivered_order() {
    let store = setup_store().await;
    let customer_id = store.customer("0901000002").await;
    store.product("SRM-01", 6_000_000, 5).await;
    store.add(&customer_id, "SRM-01", 1).await.unwrap();
    let order = store.checkout(&customer_id).await.unwrap();
    store.advance(order.order_id(), &TO_DELIVERED).await;

    let added = ReviewService::new(&store.state)
        .add(
            "SRM-01",
            from_json(json!({"customer_id": customer_id, "order_id": order.order_id(), "rating": 4, "content": "Dùng tốt"})),
        )
        .await
        .unwrap();
    assert!(added.order_completed);
    assert_eq!(added.review_count, 1);

    let order = OrderService::new(&store.state).get(order.order_id()).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);
    let customer = AccountService::new(&store.state).profile(&customer_id).await.unwrap();
    assert_eq!(customer.tier(), CustomerTier::Silver);
}

#[tokio::test]
async fn failed_checkout_leaves_stock_and_cart_untouched() {
    let store = setup_store().await;
    let customer_id = store.customer("0901000003").await;
    store.product("AAA-01", 100_000, 5).await;
    store.product("BBB-01", 200_000, 1).await;
    store.add(&customer_id, "AAA-01", 2).await.unwrap();
    store.add(&customer_id, "BBB-01", 1).await.unwrap();
    CatalogService::new(&store.state)
        .update(
            "BBB-01",
            from_json(json!({"sku": "BBB-01", "name": "BBB-01", "category": "Skincare", "price": "200000", "stock": 0})),
        )
        .await
        .unwrap();

    let err = store.checkout(&customer_id).await.unwrap_err();
    assert!(matches!(err, EcommerceError::Product(ProductError::InsufficientInventory { .. })));

    assert_eq!(store.stock_of("AAA-01").await, (5, 0));
    let cart = CartService::new(&store.state).get(&customer_id).await.unwrap();
    assert_eq!(cart.cart.items().len(), 2);
    let orders = OrderService::new(&store.state)
        .list(OrderListQuery { customer_id: customer_id.clone(), status: None })
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn cancel_restocks_and_only_the_owner_may_cancel() {
    let store = setup_store().await;
    let owner = store.customer("0901000004").await;
    let stranger = store.customer("0901000005").await;
    store.product("SRM-01", 150_000, 5).await;
    store.add(&owner, "SRM-01", 2).await.unwrap();
    let order = store.checkout(&owner).await.unwrap();
    assert_eq!(store.stock_of("SRM-01").await, (3, 2));

    let orders = OrderService::new(&store.state);
    let err = orders
        .update_status(order.order_id(), UpdateStatusRequest { status: OrderStatus::Delivered, reason: None })
        .await
        .unwrap_err();
    assert!(matches!(err, EcommerceError::Order(OrderError::InvalidTransition { .. })));
    assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);

    let action = |customer_id: &str| CustomerActionRequest { customer_id: customer_id.to_string(), reason: None };
    let err = orders.cancel(order.order_id(), action(&stranger)).await.unwrap_err();
    assert!(matches!(err, EcommerceError::Forbidden(_)));

    let cancelled = orders.cancel(order.order_id(), action(&owner)).await.unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(store.stock_of("SRM-01").await, (5, 0));
}

#[tokio::test]
async fn returned_orders_restock() {
    let store = setup_store().await;
    let customer_id = store.customer("0901000006").await;
    store.product("SRM-01", 150_000, 4).await;
    store.add(&customer_id, "SRM-01", 3).await.unwrap();
    let order = store.checkout(&customer_id).await.unwrap();
    store.advance(order.order_id(), &TO_DELIVERED).await;

    let requested = OrderService::new(&store.state)
        .request_return(order.order_id(), CustomerActionRequest { customer_id: customer_id.clone(), reason: Some("Hàng lỗi".into()) })
        .await
        .unwrap();
    assert_eq!(requested.status(), OrderStatus::ReturnRequested);
    assert_eq!(store.stock_of("SRM-01").await, (1, 3));

    let returned = store.advance(order.order_id(), &[OrderStatus::Returning, OrderStatus::Returned]).await;
    assert_eq!(returned.status(), OrderStatus::Returned);
    assert_eq!(store.stock_of("SRM-01").await, (4, 0));
}

#[tokio::test]
async fn product_promotion_usage_limit_is_enforced() {
    let store = setup_store().await;
    let first = store.customer("0901000007").await;
    let second = store.customer("0901000008").await;
    store.product("SRM-01", 50_000, 10).await;
    store.product_promotion("SERUM10", "percent", 10, "SRM-01", Some(1)).await;

    store.add(&first, "SRM-01", 1).await.unwrap();
    store.add(&second, "SRM-01", 1).await.unwrap();

    let order = store.checkout(&first).await.unwrap();
    assert_eq!(order.pricing().subtotal, vnd(45_000));
    let used = PromotionService::new(&store.state).list(from_json(json!({}))).await.unwrap();
    assert_eq!(used[0].usage_count, 1);

    // The limit is reached, so the second cart falls back to the list price.
    let order = store.checkout(&second).await.unwrap();
    assert_eq!(order.pricing().subtotal, vnd(50_000));
    assert!(order.items()[0].promotion.is_none());
    let used = PromotionService::new(&store.state).list(from_json(json!({}))).await.unwrap();
    assert_eq!(used[0].usage_count, 1);
}

#[tokio::test]
async fn buy1get1_lines_reserve_the_gifted_units() {
    let store = setup_store().await;
    let customer_id = store.customer("0901000009").await;
    store.product("SRM-01", 80_000, 3).await;
    store.product_promotion("MUA1TANG1", "buy1get1", 0, "SRM-01", None).await;

    let err = store.add(&customer_id, "SRM-01", 2).await.unwrap_err();
    assert!(matches!(
        err,
        EcommerceError::Product(ProductError::InsufficientInventory { requested: 4, available: 3, .. })
    ));
    store.add(&customer_id, "SRM-01", 1).await.unwrap();

    let order = store.checkout(&customer_id).await.unwrap();
    assert_eq!(order.items().len(), 2);
    assert_eq!(order.items()[1].item_type, ItemType::Gifted);
    assert_eq!(order.pricing().subtotal, vnd(80_000));
    assert_eq!(store.stock_of("SRM-01").await, (1, 1));
}

#[tokio::test]
async fn exhausted_checkout_code_is_rejected() {
    let store = setup_store().await;
    let customer_id = store.customer("0901000010").await;
    store.product("SRM-01", 500_000, 10).await;
    PromotionService::new(&store.state)
        .create(from_json(json!({
            "code": "GIAM50K",
            "name": "Giảm 50K",
            "discount_type": "fixed",
            "discount_value": "50000",
            "scope": "order",
            "start_date": Utc::now() - Duration::days(1),
            "end_date": Utc::now() + Duration::days(7),
            "usage_limit": 1
        })))
        .await
        .unwrap();

    let checkout = |code: &'static str| {
        let customer_id = customer_id.clone();
        let state = &store.state;
        async move {
            OrderService::new(state)
                .checkout(from_json(json!({
                    "customer_id": customer_id,
                    "promotion_code": code,
                    "shipping_info": {"full_name": "Lê Minh", "phone": "0901234567", "address": "1 Tràng Tiền", "city": "Hà Nội"}
                })))
                .await
        }
    };
    store.add(&customer_id, "SRM-01", 1).await.unwrap();
    let order = checkout("giam50k").await.unwrap();
    assert_eq!(order.pricing().order_discount, vnd(50_000));

    store.add(&customer_id, "SRM-01", 1).await.unwrap();
    let err = checkout("GIAM50K").await.unwrap_err();
    assert!(matches!(err, EcommerceError::Promotion(PromotionError::UsageExhausted(_))));
    assert_eq!(store.stock_of("SRM-01").await, (9, 1));
}
