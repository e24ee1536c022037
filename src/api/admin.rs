use axum::{extract::{Path, State}, Json};

use crate::application::backup::{BackupService, BackupSummary};
use crate::application::tiering::{TierRecomputeSummary, TieringService};
use crate::application::AppState;
use crate::domain::aggregates::Customer;
use crate::Result;

pub async fn recompute_tier(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Customer>> {
    Ok(Json(TieringService::new(&s).recompute(&id).await?))
}

pub async fn recompute_all_tiers(State(s): State<AppState>) -> Result<Json<TierRecomputeSummary>> {
    Ok(Json(TieringService::new(&s).recompute_all().await?))
}

pub async fn backup(State(s): State<AppState>) -> Result<Json<BackupSummary>> {
    Ok(Json(BackupService::new(&s).run().await?))
}
