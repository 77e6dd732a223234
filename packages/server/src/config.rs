use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Optional read replica; reads fall back to the primary when unset.
    pub database_replica_url: Option<String>,
    pub db_max_connections: u32,
    pub port: u16,
    /// Plaintext password assigned to synthetic users before hashing.
    pub synthetic_user_password: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_replica_url: env::var("DATABASE_REPLICA_URL").ok(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DB_MAX_CONNECTIONS must be a valid number")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            synthetic_user_password: env::var("SYNTHETIC_USER_PASSWORD")
                .context("SYNTHETIC_USER_PASSWORD must be set")?,
        })
    }
}
