//! Durable storage for job rows.
//!
//! The engine talks to the store through the `JobStore` trait so tests can
//! substitute an in-memory implementation; `PostgresJobStore` is the real
//! one, backed by the `randomizing_jobs` table.

use anyhow::Context;
use async_trait::async_trait;

use super::models::job::{JobPage, JobUpdate, ListJobsRequest, RandomizingJob};
use crate::common::pagination::{fetch_limit, trim_results};
use crate::common::{ServiceError, ServiceResult};
use crate::kernel::DbCluster;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a QUEUED row with a zero counter, returning the new id.
    async fn create(&self, expected_count: i64) -> ServiceResult<i64>;

    async fn find_by_id(&self, id: i64) -> ServiceResult<Option<RandomizingJob>>;

    /// Keyset-paginated scan in id order.
    async fn list(&self, req: &ListJobsRequest) -> ServiceResult<JobPage>;

    /// Write only the fields named by `fields`; `NotFound` when the row
    /// does not exist.
    async fn update(&self, job: &RandomizingJob, fields: JobUpdate) -> ServiceResult<()>;
}

pub struct PostgresJobStore {
    db: DbCluster,
}

impl PostgresJobStore {
    pub fn new(db: DbCluster) -> Self {
        Self { db }
    }
}

const JOB_COLUMNS: &str =
    "id, expected_count, current_count, status, started_at, finished_at, error_message";

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create(&self, expected_count: i64) -> ServiceResult<i64> {
        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO randomizing_jobs (expected_count) VALUES ($1) RETURNING id")
                .bind(expected_count)
                .fetch_one(self.db.writes())
                .await
                .context("failed to create randomizing job")?;

        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> ServiceResult<Option<RandomizingJob>> {
        let job = sqlx::query_as::<_, RandomizingJob>(&format!(
            "SELECT {JOB_COLUMNS} FROM randomizing_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.db.writes())
        .await
        .context("failed to read randomizing job")?;

        Ok(job)
    }

    async fn list(&self, req: &ListJobsRequest) -> ServiceResult<JobPage> {
        let statuses: Vec<String> = req
            .statuses
            .iter()
            .map(|status| status.as_str().to_string())
            .collect();

        let rows = sqlx::query_as::<_, RandomizingJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM randomizing_jobs
            WHERE id > $1
              AND (cardinality($2::TEXT[]) = 0 OR status = ANY($2))
            ORDER BY id ASC
            LIMIT $3
            "#
        ))
        .bind(req.cursor)
        .bind(&statuses)
        .bind(fetch_limit(req.limit))
        .fetch_all(self.db.writes())
        .await
        .context("failed to list randomizing jobs")?;

        let (items, has_next) = trim_results(rows, req.limit);
        Ok(JobPage { items, has_next })
    }

    async fn update(&self, job: &RandomizingJob, fields: JobUpdate) -> ServiceResult<()> {
        let result = match fields {
            JobUpdate::MarkRunning => {
                sqlx::query(
                    r#"
                    UPDATE randomizing_jobs
                    SET status = $2, started_at = $3, finished_at = $4, error_message = $5
                    WHERE id = $1
                    "#,
                )
                .bind(job.id)
                .bind(job.status)
                .bind(job.started_at)
                .bind(job.finished_at)
                .bind(&job.error_message)
                .execute(self.db.writes())
                .await
            }
            JobUpdate::MarkResuming => {
                sqlx::query(
                    "UPDATE randomizing_jobs SET finished_at = $2, error_message = $3 WHERE id = $1",
                )
                .bind(job.id)
                .bind(job.finished_at)
                .bind(&job.error_message)
                .execute(self.db.writes())
                .await
            }
            JobUpdate::MarkTerminal => {
                sqlx::query(
                    r#"
                    UPDATE randomizing_jobs
                    SET status = $2, finished_at = $3, error_message = $4
                    WHERE id = $1
                    "#,
                )
                .bind(job.id)
                .bind(job.status)
                .bind(job.finished_at)
                .bind(&job.error_message)
                .execute(self.db.writes())
                .await
            }
            JobUpdate::TickCount => {
                sqlx::query("UPDATE randomizing_jobs SET current_count = $2 WHERE id = $1")
                    .bind(job.id)
                    .bind(job.current_count)
                    .execute(self.db.writes())
                    .await
            }
        };

        let result = result.context("failed to update randomizing job")?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found(format!(
                "randomizing job {} not found",
                job.id
            )));
        }

        Ok(())
    }
}
