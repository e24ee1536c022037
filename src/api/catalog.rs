use axum::{extract::{Path, Query, State}, http::StatusCode, Json};

use crate::application::catalog::{CatalogService, PricedProduct, ProductQuery, ProductRequest};
use crate::application::{AppState, Paginated};
use crate::domain::aggregates::Product;
use crate::Result;

pub async fn list_products(
    State(s): State<AppState>,
    Query(q): Query<ProductQuery>,
) -> Result<Json<Paginated<PricedProduct>>> {
    Ok(Json(CatalogService::new(&s).list(q).await?))
}

pub async fn get_product(State(s): State<AppState>, Path(sku): Path<String>) -> Result<Json<PricedProduct>> {
    Ok(Json(CatalogService::new(&s).get(&sku).await?))
}

pub async fn create_product(State(s): State<AppState>, Json(r): Json<ProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    let product = CatalogService::new(&s).create(r).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(s): State<AppState>,
    Path(sku): Path<String>,
    Json(r): Json<ProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(CatalogService::new(&s).update(&sku, r).await?))
}

pub async fn archive_product(State(s): State<AppState>, Path(sku): Path<String>) -> Result<StatusCode> {
    CatalogService::new(&s).archive(&sku).await?;
    Ok(StatusCode::NO_CONTENT)
}
