//! `PostgreSQL` repositories.
//!
//! Each function issues a single statement and is generic over the executor,
//! so callers can run it against the pool or inside a transaction
//! (`&mut *tx`). Functions that need several statements take a
//! `&mut PgConnection` instead.

pub mod carts;
pub mod customers;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod reviews;

use crate::EcommerceError;

/// Converts a stored counter back into the domain's unsigned form.
pub(crate) fn to_u32(value: i32, field: &str) -> Result<u32, EcommerceError> {
    u32::try_from(value).map_err(|_| EcommerceError::DataCorruption(format!("negative {field}: {value}")))
}

/// Counters are stored as `INTEGER`; values past `i32::MAX` are rejected.
pub(crate) fn to_db_int(value: u32, field: &str) -> Result<i32, EcommerceError> {
    i32::try_from(value).map_err(|_| EcommerceError::Validation(format!("{field} {value} exceeds the maximum of {}", i32::MAX)))
}

pub(crate) fn corrupt(field: &str, err: impl std::fmt::Display) -> EcommerceError {
    EcommerceError::DataCorruption(format!("invalid {field} in database: {err}"))
}

/// Maps unique-constraint violations to a conflict, everything else to storage errors.
pub(crate) fn unique_conflict(err: sqlx::Error, message: impl FnOnce() -> String) -> EcommerceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => EcommerceError::Conflict(message()),
        _ => EcommerceError::StorageError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_past_integer_range_are_rejected() {
        assert_eq!(to_db_int(42, "stock").unwrap(), 42);
        assert_eq!(to_db_int(i32::MAX as u32, "stock").unwrap(), i32::MAX);
        assert!(matches!(to_db_int(u32::MAX, "stock"), Err(EcommerceError::Validation(m)) if m.starts_with("stock ")));
        assert!(matches!(to_u32(-1, "stock"), Err(EcommerceError::DataCorruption(_))));
    }
}
