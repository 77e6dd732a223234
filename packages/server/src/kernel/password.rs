//! Password hashing on the blocking pool.
//!
//! bcrypt at the default cost takes tens of milliseconds per hash, so it
//! must never run on the async executor threads.

use anyhow::{Context, Result};

/// Hash a plaintext password with bcrypt.
pub async fn hash_password(plaintext: String) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, bcrypt::DEFAULT_COST))
        .await
        .context("password hashing task panicked")?
        .context("failed to hash password")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_produces_verifiable_bcrypt() {
        let hash = hash_password("hunter2".to_string()).await.unwrap();
        assert_ne!(hash, "hunter2");
        assert!(bcrypt::verify("hunter2", &hash).unwrap());
        assert!(!bcrypt::verify("wrong", &hash).unwrap());
    }
}
