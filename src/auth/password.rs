//! Argon2id password hashing, run on tokio's blocking pool.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tokio::task::spawn_blocking;
use tracing::error;

/// Hash `plain` into a PHC string with a fresh random salt.
pub async fn hash_password(plain: &str) -> anyhow::Result<String> {
    let plain = plain.to_owned();
    spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| {
                error!(error = %e, "argon2 hashing failed");
                anyhow::anyhow!("hash password: {e}")
            })
    })
    .await?
}

/// `Ok(false)` for a mismatch; `Err` only when `phc` is not a valid hash.
pub async fn verify_password(plain: &str, phc: &str) -> anyhow::Result<bool> {
    let (plain, phc) = (plain.to_owned(), phc.to_owned());
    spawn_blocking(move || -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(&phc).map_err(|e| {
            error!(error = %e, "stored password hash is malformed");
            anyhow::anyhow!("parse password hash: {e}")
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_are_salted_argon2id() {
        let a = hash_password("same-input").await.unwrap();
        let b = hash_password("same-input").await.unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(verify_password("same-input", &a).await.unwrap());
        assert!(verify_password("same-input", &b).await.unwrap());
    }

    #[tokio::test]
    async fn mismatch_is_false_not_error() {
        let phc = hash_password("correct-horse").await.unwrap();
        assert!(!verify_password("battery-staple", &phc).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "plaintext-in-db").await.is_err());
    }
}
