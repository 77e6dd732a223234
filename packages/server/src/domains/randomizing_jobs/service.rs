//! The randomizing job engine.
//!
//! A single background task polls for QUEUED/PROCESSING rows and runs them
//! one at a time: generate a portion of synthetic users, push them through
//! the batch sink, commit the new counter, repeat. Cancellation is
//! cooperative; the runner checks its token at the top of every batch and
//! the cancel path commits the terminal row itself, so a batch already in
//! flight finishes but never overwrites the CANCELLED status.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::models::job::{JobPage, JobStatus, JobUpdate, ListJobsRequest, RandomizingJob};
use super::registry::RunnerRegistry;
use super::store::JobStore;
use crate::common::pagination::{normalize_limit, MAX_LIST_LIMIT};
use crate::common::{ServiceError, ServiceResult};
use crate::domains::users::models::user::NewUser;
use crate::domains::users::service::{BatchInsertReport, UserService};

/// Users generated and inserted per runner iteration. Small enough that a
/// crash loses at most one portion of progress.
pub const BATCH_SIZE: i64 = 100;

/// Sleep between polls when the list is empty or the store failed.
pub const POLL_BACKOFF: Duration = Duration::from_secs(5);

/// What the engine needs from the user domain: a source of candidates and
/// a sink that swallows them with per-record error reporting.
#[async_trait]
pub trait UserBatchSink: Send + Sync {
    async fn generate_random(&self, count: i64) -> ServiceResult<Vec<NewUser>>;
    async fn create_batch(&self, users: Vec<NewUser>) -> ServiceResult<BatchInsertReport>;
}

#[async_trait]
impl UserBatchSink for UserService {
    async fn generate_random(&self, count: i64) -> ServiceResult<Vec<NewUser>> {
        UserService::generate_random(self, count).await
    }

    async fn create_batch(&self, users: Vec<NewUser>) -> ServiceResult<BatchInsertReport> {
        UserService::create_batch(self, users).await
    }
}

/// Engine tunables; defaults match production behavior.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub batch_size: i64,
    pub poll_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            poll_backoff: POLL_BACKOFF,
        }
    }
}

pub struct RandomizingJobService {
    store: Arc<dyn JobStore>,
    users: Arc<dyn UserBatchSink>,
    registry: RunnerRegistry,
    config: EngineConfig,
    shutdown: CancellationToken,
}

impl RandomizingJobService {
    pub fn new(store: Arc<dyn JobStore>, users: Arc<dyn UserBatchSink>) -> Self {
        Self::with_config(store, users, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn JobStore>,
        users: Arc<dyn UserBatchSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            users,
            registry: RunnerRegistry::new(),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a new job. The row starts QUEUED; the poll loop picks it up.
    pub async fn create(&self, expected_count: i64) -> ServiceResult<i64> {
        if expected_count <= 0 {
            return Err(ServiceError::bad_request(
                "expected users count must be greater than 0",
            ));
        }

        self.store.create(expected_count).await
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<RandomizingJob> {
        if id <= 0 {
            return Err(ServiceError::bad_request("job ID must be greater than 0"));
        }

        self.store.find_by_id(id).await?.ok_or_else(|| {
            ServiceError::not_found(format!("randomizing job {id} not found"))
        })
    }

    pub async fn get_list(&self, mut req: ListJobsRequest) -> ServiceResult<JobPage> {
        req.limit = normalize_limit(req.limit)?;
        self.store.list(&req).await
    }

    /// Cancel a job: signal its runner (if any) and commit the terminal
    /// row. The commit happens after the signal, so the runner's next
    /// checkpoint sees the token and writes nothing further; this write
    /// is authoritative.
    pub async fn cancel(&self, id: i64) -> ServiceResult<()> {
        let mut job = self.get_by_id(id).await?;

        if job.status.is_terminal() {
            return Err(ServiceError::bad_request("job is already stopped"));
        }

        self.registry.cancel(job.id);

        job.status = JobStatus::Cancelled;
        job.error_message = "job was cancelled by user".to_string();
        self.finish(&mut job).await
    }

    /// Spawn the poll loop. Call once at startup.
    pub fn start(self: &Arc<Self>) {
        info!("starting randomizing job engine");

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.poll_loop().await;
        });
    }

    /// Signal the poll loop and every active runner, without waiting for
    /// in-flight batches. Draining with a deadline is the caller's call.
    pub fn stop(&self) {
        info!("stopping randomizing job engine");
        self.shutdown.cancel();
        self.registry.cancel_all();
    }

    async fn poll_loop(&self) {
        let search = ListJobsRequest {
            statuses: vec![JobStatus::Queued, JobStatus::Processing],
            limit: MAX_LIST_LIMIT,
            cursor: 0,
        };

        loop {
            if self.shutdown.is_cancelled() {
                info!("randomizing job engine loop stopped");
                return;
            }

            let page = match self.store.list(&search).await {
                Ok(page) => page,
                Err(err) => {
                    error!(error = %err, "failed to get jobs");
                    if self.backoff().await.is_err() {
                        return;
                    }
                    continue;
                }
            };

            if page.items.is_empty() {
                if self.backoff().await.is_err() {
                    return;
                }
                continue;
            }

            for mut job in page.items {
                if self.shutdown.is_cancelled() {
                    return;
                }

                let token = self.shutdown.child_token();
                self.registry.register(job.id, token.clone());

                if let Err(err) = self.run_job(&token, &mut job).await {
                    error!(
                        randomizing_job_id = job.id,
                        error = %err,
                        "failed to run job"
                    );
                }

                self.registry.unregister(job.id);
            }
        }
    }

    /// Sleep `poll_backoff`, or return `Err` when shutdown wins the race.
    async fn backoff(&self) -> Result<(), ()> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(()),
            _ = tokio::time::sleep(self.config.poll_backoff) => Ok(()),
        }
    }

    /// Per-job batch loop.
    ///
    /// Failures inside a batch terminate this job as FAILED; they never
    /// take the poll loop down. A cancelled token means the cancel path
    /// owns the terminal row, so the runner just returns.
    async fn run_job(
        &self,
        cancel: &CancellationToken,
        job: &mut RandomizingJob,
    ) -> ServiceResult<()> {
        loop {
            if cancel.is_cancelled() || job.status.is_terminal() {
                return Ok(());
            }

            let users_left_to_add =
                (job.expected_count - job.current_count).min(self.config.batch_size);
            info!(
                randomizing_job_id = job.id,
                users_left_to_add, "starting new users portion"
            );

            if users_left_to_add <= 0 {
                job.status = JobStatus::Completed;
                job.error_message.clear();
                return self.finish(job).await;
            }

            if let Err(err) = self.mark_in_progress(job).await {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                job.status = JobStatus::Failed;
                job.error_message = format!("failed to update job status: {err}");
                return self.finish(job).await;
            }

            let users = match self.users.generate_random(users_left_to_add).await {
                Ok(users) => users,
                Err(err) => {
                    job.status = JobStatus::Failed;
                    job.error_message = format!("failed to generate random data: {err}");
                    return self.finish(job).await;
                }
            };

            let report = match self.users.create_batch(users).await {
                Ok(report) => report,
                Err(err) => {
                    job.status = JobStatus::Failed;
                    job.error_message = format!("failed to create batch: {err}");
                    return self.finish(job).await;
                }
            };

            for rejected in &report.rejected {
                warn!(
                    randomizing_job_id = job.id,
                    user = %rejected.user.email,
                    error = %rejected.reason,
                    "there are errors in random data"
                );
            }

            job.current_count =
                (job.current_count + report.inserted_count).min(job.expected_count);
            info!(
                randomizing_job_id = job.id,
                users_left_to_add,
                added_users_count = report.inserted_count,
                current_count = job.current_count,
                "added new users portion"
            );

            if let Err(err) = self.store.update(job, JobUpdate::TickCount).await {
                job.status = JobStatus::Failed;
                job.error_message = format!("failed to update count: {err}");
                return self.finish(job).await;
            }
        }
    }

    /// Resume guard, written before each batch: promote a QUEUED row to
    /// PROCESSING, or clear the failure fields of a row found PROCESSING
    /// after a restart. Neither mask touches started_at once it is set.
    async fn mark_in_progress(&self, job: &mut RandomizingJob) -> ServiceResult<()> {
        match job.status {
            JobStatus::Queued => {
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
                job.finished_at = None;
                job.error_message.clear();
                self.store.update(job, JobUpdate::MarkRunning).await
            }
            JobStatus::Processing => {
                job.finished_at = None;
                job.error_message.clear();
                self.store.update(job, JobUpdate::MarkResuming).await
            }
            // Terminal rows are never listed, and the loop returns before
            // reaching this point.
            _ => Ok(()),
        }
    }

    /// Commit a terminal transition. The caller has already set `status`
    /// and `error_message`; a persistence failure here is reported to the
    /// poll loop, which logs it and moves on (the next poll resumes the
    /// still-PROCESSING row).
    async fn finish(&self, job: &mut RandomizingJob) -> ServiceResult<()> {
        job.finished_at = Some(Utc::now());

        info!(
            randomizing_job_id = job.id,
            randomizing_job_status = job.status.as_str(),
            randomizing_job_error_message = %job.error_message,
            "finishing randomizing job"
        );

        self.store.update(job, JobUpdate::MarkTerminal).await
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &RunnerRegistry {
        &self.registry
    }
}
