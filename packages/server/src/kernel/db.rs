//! Primary/replica connection pools.
//!
//! All writes and the job engine's reads go to the primary; user-facing
//! GET endpoints read from the replica when one is configured.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

#[derive(Clone)]
pub struct DbCluster {
    primary: PgPool,
    replica: Option<PgPool>,
}

impl DbCluster {
    /// Connect the primary pool and, if configured, the replica pool.
    pub async fn connect(config: &Config) -> Result<Self> {
        let primary = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("failed to connect to primary database")?;

        let replica = match &config.database_replica_url {
            Some(url) => Some(
                PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await
                    .context("failed to connect to replica database")?,
            ),
            None => None,
        };

        Ok(Self { primary, replica })
    }

    /// Pool for writes and read-your-writes paths.
    pub fn writes(&self) -> &PgPool {
        &self.primary
    }

    /// Pool for user-facing reads; falls back to the primary.
    pub fn reads(&self) -> &PgPool {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    pub async fn close(&self) {
        self.primary.close().await;
        if let Some(replica) = &self.replica {
            replica.close().await;
        }
    }
}
