use axum::{extract::{Path, Query, State}, http::StatusCode, Json};

use crate::application::orders::{
    CheckoutRequest, CustomerActionRequest, OrderListQuery, OrderService, Quote, QuoteRequest, UpdateStatusRequest,
};
use crate::application::AppState;
use crate::domain::aggregates::Order;
use crate::Result;

pub async fn quote(State(s): State<AppState>, Json(r): Json<QuoteRequest>) -> Result<Json<Quote>> {
    Ok(Json(OrderService::new(&s).quote(r).await?))
}

pub async fn checkout(State(s): State<AppState>, Json(r): Json<CheckoutRequest>) -> Result<(StatusCode, Json<Order>)> {
    let order = OrderService::new(&s).checkout(r).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(State(s): State<AppState>, Query(q): Query<OrderListQuery>) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderService::new(&s).list(q).await?))
}

pub async fn get_order(State(s): State<AppState>, Path(order_id): Path<String>) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&s).get(&order_id).await?))
}

pub async fn update_status(
    State(s): State<AppState>,
    Path(order_id): Path<String>,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&s).update_status(&order_id, r).await?))
}

pub async fn cancel(
    State(s): State<AppState>,
    Path(order_id): Path<String>,
    Json(r): Json<CustomerActionRequest>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&s).cancel(&order_id, r).await?))
}

pub async fn request_return(
    State(s): State<AppState>,
    Path(order_id): Path<String>,
    Json(r): Json<CustomerActionRequest>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&s).request_return(&order_id, r).await?))
}
