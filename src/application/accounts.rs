//! Customer registration, login and password changes.

use serde::Deserialize;
use validator::Validate;

use super::AppState;
use crate::domain::aggregates::Customer;
use crate::domain::value_objects::Phone;
use crate::infrastructure::password::{hash_password, verify_password};
use crate::infrastructure::repositories::customers;
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 9, max = 16))]
    pub phone: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

pub struct AccountService<'a> {
    state: &'a AppState,
}

impl<'a> AccountService<'a> {
    pub fn new(state: &'a AppState) -> Self { Self { state } }

    pub async fn register(&self, req: RegisterRequest) -> Result<Customer> {
        req.validate()?;
        let phone = Phone::parse(req.phone)?;
        let hash = hash_password(&req.password)?;
        let mut customer = Customer::register(new_customer_id(), phone, req.full_name.trim(), req.email, hash);
        customers::insert(self.state.pool(), &customer).await?;
        tracing::info!(customer_id = customer.customer_id(), "Customer registered");
        self.state.events().publish_all(customer.take_events()).await;
        Ok(customer)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<Customer> {
        req.validate()?;
        let phone = Phone::parse(req.phone).map_err(|_| EcommerceError::InvalidCredentials)?;
        let customer = customers::find_by_phone(self.state.pool(), &phone)
            .await?
            .ok_or(EcommerceError::InvalidCredentials)?;
        verify_password(&req.password, customer.password_hash())?;
        tracing::info!(customer_id = customer.customer_id(), "Customer logged in");
        Ok(customer)
    }

    pub async fn change_password(&self, customer_id: &str, req: ChangePasswordRequest) -> Result<Customer> {
        req.validate()?;
        let mut tx = self.state.pool().begin().await?;
        let mut customer = customers::find_for_update(&mut *tx, customer_id)
            .await?
            .ok_or_else(|| EcommerceError::CustomerNotFound(customer_id.to_string()))?;
        verify_password(&req.current_password, customer.password_hash())?;
        customer.change_password_hash(hash_password(&req.new_password)?);
        customers::update(&mut *tx, &customer).await?;
        tx.commit().await?;
        tracing::info!(customer_id, password_version = customer.password_version(), "Password changed");
        self.state.events().publish_all(customer.take_events()).await;
        Ok(customer)
    }

    pub async fn profile(&self, customer_id: &str) -> Result<Customer> {
        customers::find(self.state.pool(), customer_id)
            .await?
            .ok_or_else(|| EcommerceError::CustomerNotFound(customer_id.to_string()))
    }
}

/// `KH` followed by ten random digits.
fn new_customer_id() -> String {
    format!("KH{:010}", rand::random::<u32>())
}
