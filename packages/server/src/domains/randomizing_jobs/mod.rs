// Randomizing job engine: durable job rows, an in-memory registry of
// running jobs, and the polling service that drives batches of synthetic
// users into the store.

pub mod models;
pub mod registry;
pub mod service;
pub mod store;
pub mod testing;

pub use models::job::{JobPage, JobStatus, JobUpdate, ListJobsRequest, RandomizingJob};
pub use registry::RunnerRegistry;
pub use service::{EngineConfig, RandomizingJobService, UserBatchSink};
pub use store::{JobStore, PostgresJobStore};
