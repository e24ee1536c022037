use axum::{extract::{Path, Query, State}, http::StatusCode, Json};

use crate::application::promotions::{
    CodeValidation, PromotionDetail, PromotionListQuery, PromotionRequest, PromotionService, TargetsRequest,
    ValidateCodeRequest,
};
use crate::application::AppState;
use crate::domain::aggregates::Promotion;
use crate::Result;

pub async fn list_promotions(
    State(s): State<AppState>,
    Query(q): Query<PromotionListQuery>,
) -> Result<Json<Vec<Promotion>>> {
    Ok(Json(PromotionService::new(&s).list(q).await?))
}

pub async fn get_promotion(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<PromotionDetail>> {
    Ok(Json(PromotionService::new(&s).get(&id).await?))
}

pub async fn create_promotion(
    State(s): State<AppState>,
    Json(r): Json<PromotionRequest>,
) -> Result<(StatusCode, Json<PromotionDetail>)> {
    let promotion = PromotionService::new(&s).create(r).await?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

pub async fn update_promotion(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Json(r): Json<PromotionRequest>,
) -> Result<Json<PromotionDetail>> {
    Ok(Json(PromotionService::new(&s).update(&id, r).await?))
}

pub async fn deactivate_promotion(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Promotion>> {
    Ok(Json(PromotionService::new(&s).deactivate(&id).await?))
}

pub async fn replace_targets(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Json(r): Json<TargetsRequest>,
) -> Result<Json<PromotionDetail>> {
    Ok(Json(PromotionService::new(&s).replace_targets(&id, r).await?))
}

pub async fn validate_code(State(s): State<AppState>, Json(r): Json<ValidateCodeRequest>) -> Result<Json<CodeValidation>> {
    Ok(Json(PromotionService::new(&s).validate_code(r).await?))
}
