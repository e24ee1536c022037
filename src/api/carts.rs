use axum::{extract::{Path, State}, Json};

use crate::application::carts::{AddItemRequest, CartService, CartView, SelectionRequest, UpdateItemRequest};
use crate::application::AppState;
use crate::Result;

pub async fn get_cart(State(s): State<AppState>, Path(customer_id): Path<String>) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(&s).get(&customer_id).await?))
}

pub async fn add_item(
    State(s): State<AppState>,
    Path(customer_id): Path<String>,
    Json(r): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(&s).add_item(&customer_id, r).await?))
}

pub async fn update_item(
    State(s): State<AppState>,
    Path((customer_id, sku)): Path<(String, String)>,
    Json(r): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(&s).update_item(&customer_id, &sku, r).await?))
}

pub async fn remove_item(
    State(s): State<AppState>,
    Path((customer_id, sku)): Path<(String, String)>,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(&s).remove_item(&customer_id, &sku).await?))
}

pub async fn select_all(
    State(s): State<AppState>,
    Path(customer_id): Path<String>,
    Json(r): Json<SelectionRequest>,
) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(&s).select_all(&customer_id, r).await?))
}

pub async fn clear_cart(State(s): State<AppState>, Path(customer_id): Path<String>) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(&s).clear(&customer_id).await?))
}
