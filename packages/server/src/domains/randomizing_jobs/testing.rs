//! In-memory fixtures for exercising the engine without Postgres.
//!
//! `InMemoryJobStore` mirrors the sparse-update contract of the real store
//! and keeps a log of every write so tests can assert on the exact
//! sequence of transitions. `ScriptedUserSink` stands in for the user
//! domain; by default every candidate inserts, and individual batches can
//! be scripted to insert partially or fail outright.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::models::job::{JobPage, JobStatus, JobUpdate, ListJobsRequest, RandomizingJob};
use super::service::UserBatchSink;
use super::store::JobStore;
use crate::common::pagination::trim_results;
use crate::common::{ServiceError, ServiceResult};
use crate::domains::users::models::user::{Gender, NewUser};
use crate::domains::users::service::{BatchInsertReport, RejectedUser};

/// One committed write, with the row as it looked right after the write.
#[derive(Debug, Clone)]
pub struct UpdateOp {
    pub job_id: i64,
    pub fields: JobUpdate,
    pub snapshot: RandomizingJob,
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<BTreeMap<i64, RandomizingJob>>,
    next_id: AtomicI64,
    ops: Mutex<Vec<UpdateOp>>,
    list_calls: AtomicUsize,
    fail_lists: AtomicUsize,
    fail_updates: AtomicUsize,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub fn seed(&self, job: RandomizingJob) {
        let mut jobs = self.jobs.lock().expect("job store lock poisoned");
        self.next_id.fetch_max(job.id + 1, Ordering::SeqCst);
        jobs.insert(job.id, job);
    }

    pub fn get(&self, id: i64) -> Option<RandomizingJob> {
        self.jobs
            .lock()
            .expect("job store lock poisoned")
            .get(&id)
            .cloned()
    }

    pub fn ops(&self) -> Vec<UpdateOp> {
        self.ops.lock().expect("op log lock poisoned").clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` list calls fail with a transient error.
    pub fn fail_next_lists(&self, n: usize) {
        self.fail_lists.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` update calls fail with a transient error.
    pub fn fail_next_updates(&self, n: usize) {
        self.fail_updates.store(n, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, expected_count: i64) -> ServiceResult<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let job = RandomizingJob {
            id,
            expected_count,
            current_count: 0,
            status: JobStatus::Queued,
            started_at: None,
            finished_at: None,
            error_message: String::new(),
        };

        self.jobs
            .lock()
            .expect("job store lock poisoned")
            .insert(id, job);
        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> ServiceResult<Option<RandomizingJob>> {
        Ok(self.get(id))
    }

    async fn list(&self, req: &ListJobsRequest) -> ServiceResult<JobPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_lists) {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "induced list failure"
            )));
        }

        let jobs = self.jobs.lock().expect("job store lock poisoned");
        let rows: Vec<RandomizingJob> = jobs
            .range(req.cursor.saturating_add(1)..)
            .map(|(_, job)| job.clone())
            .filter(|job| req.statuses.is_empty() || req.statuses.contains(&job.status))
            .take(req.limit as usize + 1)
            .collect();

        let (items, has_next) = trim_results(rows, req.limit);
        Ok(JobPage { items, has_next })
    }

    async fn update(&self, job: &RandomizingJob, fields: JobUpdate) -> ServiceResult<()> {
        if Self::take_failure(&self.fail_updates) {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "induced update failure"
            )));
        }

        let mut jobs = self.jobs.lock().expect("job store lock poisoned");
        let row = jobs.get_mut(&job.id).ok_or_else(|| {
            ServiceError::not_found(format!("randomizing job {} not found", job.id))
        })?;

        match fields {
            JobUpdate::MarkRunning => {
                row.status = job.status;
                row.started_at = job.started_at;
                row.finished_at = job.finished_at;
                row.error_message = job.error_message.clone();
            }
            JobUpdate::MarkResuming => {
                row.finished_at = job.finished_at;
                row.error_message = job.error_message.clone();
            }
            JobUpdate::MarkTerminal => {
                row.status = job.status;
                row.finished_at = job.finished_at;
                row.error_message = job.error_message.clone();
            }
            JobUpdate::TickCount => {
                row.current_count = job.current_count;
            }
        }

        let snapshot = row.clone();
        drop(jobs);

        self.ops.lock().expect("op log lock poisoned").push(UpdateOp {
            job_id: job.id,
            fields,
            snapshot,
        });
        Ok(())
    }
}

/// Scripted behavior for one `create_batch` call.
#[derive(Debug, Clone)]
pub enum BatchScript {
    /// Insert `inserted` rows and reject `rejected` candidates with
    /// per-record reasons.
    Partial { inserted: i64, rejected: usize },
    /// Batch-level failure.
    Fail(String),
}

#[derive(Default)]
pub struct ScriptedUserSink {
    scripts: Mutex<VecDeque<BatchScript>>,
    generate_failures: Mutex<VecDeque<String>>,
    batch_sizes: Mutex<Vec<i64>>,
    inserted_total: AtomicI64,
    email_seq: AtomicI64,
}

impl ScriptedUserSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_script(&self, script: BatchScript) {
        self.scripts
            .lock()
            .expect("script lock poisoned")
            .push_back(script);
    }

    pub fn fail_next_generate(&self, message: impl Into<String>) {
        self.generate_failures
            .lock()
            .expect("script lock poisoned")
            .push_back(message.into());
    }

    /// Requested sizes of every batch so far.
    pub fn batch_sizes(&self) -> Vec<i64> {
        self.batch_sizes
            .lock()
            .expect("script lock poisoned")
            .clone()
    }

    pub fn inserted_total(&self) -> i64 {
        self.inserted_total.load(Ordering::SeqCst)
    }

    fn candidate(&self) -> NewUser {
        let n = self.email_seq.fetch_add(1, Ordering::SeqCst);
        NewUser {
            email: format!("user-{n}@example.com"),
            password: "pw".to_string(),
            city_id: 1,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
            gender: Gender::Unknown,
            interests: String::new(),
        }
    }
}

#[async_trait]
impl UserBatchSink for ScriptedUserSink {
    async fn generate_random(&self, count: i64) -> ServiceResult<Vec<NewUser>> {
        // Yield like the real implementation, which hits the database.
        tokio::task::yield_now().await;

        let failure = self
            .generate_failures
            .lock()
            .expect("script lock poisoned")
            .pop_front();
        if let Some(message) = failure {
            return Err(ServiceError::Internal(anyhow::anyhow!(message)));
        }

        Ok((0..count).map(|_| self.candidate()).collect())
    }

    async fn create_batch(&self, users: Vec<NewUser>) -> ServiceResult<BatchInsertReport> {
        // Emulate the insert round-trip; engine tests run with a paused
        // clock, so this costs nothing in wall time.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        self.batch_sizes
            .lock()
            .expect("script lock poisoned")
            .push(users.len() as i64);

        let script = self
            .scripts
            .lock()
            .expect("script lock poisoned")
            .pop_front();

        let report = match script {
            None => BatchInsertReport {
                inserted_count: users.len() as i64,
                rejected: Vec::new(),
            },
            Some(BatchScript::Partial { inserted, rejected }) => BatchInsertReport {
                inserted_count: inserted,
                rejected: users
                    .into_iter()
                    .take(rejected)
                    .map(|user| RejectedUser {
                        user,
                        reason: "email is already taken".to_string(),
                    })
                    .collect(),
            },
            Some(BatchScript::Fail(message)) => {
                return Err(ServiceError::Internal(anyhow::anyhow!(message)));
            }
        };

        self.inserted_total
            .fetch_add(report.inserted_count, Ordering::SeqCst);
        Ok(report)
    }
}
