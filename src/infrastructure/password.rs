//! Password hashing with Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::EcommerceError;

pub fn hash_password(password: &str) -> Result<String, EcommerceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| EcommerceError::PasswordHash)
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), EcommerceError> {
    let parsed = PasswordHash::new(hash).map_err(|_| EcommerceError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| EcommerceError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(verify_password("wrong", &hash), Err(EcommerceError::InvalidCredentials)));
        assert!(matches!(verify_password("x", "not-a-hash"), Err(EcommerceError::InvalidCredentials)));
    }
}
