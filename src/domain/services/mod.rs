//! Stateless business rules shared by the application services.
pub mod pricing;
pub mod tiering;
