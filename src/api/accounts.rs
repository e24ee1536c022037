use axum::{extract::{Path, State}, http::StatusCode, Json};

use crate::application::accounts::{AccountService, ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::application::AppState;
use crate::domain::aggregates::Customer;
use crate::Result;

pub async fn register(State(s): State<AppState>, Json(r): Json<RegisterRequest>) -> Result<(StatusCode, Json<Customer>)> {
    let customer = AccountService::new(&s).register(r).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> Result<Json<Customer>> {
    Ok(Json(AccountService::new(&s).login(r).await?))
}

pub async fn profile(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Customer>> {
    Ok(Json(AccountService::new(&s).profile(&id).await?))
}

pub async fn change_password(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Json(r): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    AccountService::new(&s).change_password(&id, r).await?;
    Ok(StatusCode::NO_CONTENT)
}
