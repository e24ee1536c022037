use axum::{extract::{Path, State}, http::StatusCode, Json};

use crate::application::reviews::{AddReviewRequest, AddedReview, LikeCount, LikeRequest, ReplyRequest, ReviewService};
use crate::application::AppState;
use crate::domain::aggregates::ProductReviews;
use crate::Result;

pub async fn list_reviews(State(s): State<AppState>, Path(sku): Path<String>) -> Result<Json<ProductReviews>> {
    Ok(Json(ReviewService::new(&s).list(&sku).await?))
}

pub async fn add_review(
    State(s): State<AppState>,
    Path(sku): Path<String>,
    Json(r): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<AddedReview>)> {
    let added = ReviewService::new(&s).add(&sku, r).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

pub async fn toggle_like(
    State(s): State<AppState>,
    Path((sku, review_id)): Path<(String, String)>,
    Json(r): Json<LikeRequest>,
) -> Result<Json<LikeCount>> {
    Ok(Json(ReviewService::new(&s).toggle_like(&sku, &review_id, r).await?))
}

pub async fn reply(
    State(s): State<AppState>,
    Path((sku, review_id)): Path<(String, String)>,
    Json(r): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<ProductReviews>)> {
    let doc = ReviewService::new(&s).reply(&sku, &review_id, r).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}
