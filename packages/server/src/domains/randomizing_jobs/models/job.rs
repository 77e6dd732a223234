use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a randomizing job.
///
/// `Queued -> Processing` happens before the first batch; `Processing`
/// rows are picked up again after a restart. The three terminal states
/// are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Processing,
    Cancelled,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Terminal rows accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Cancelled | JobStatus::Completed | JobStatus::Failed
        )
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobStatus::Queued),
            "PROCESSING" => Ok(JobStatus::Processing),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// One unit of work that materialises `expected_count` synthetic users.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RandomizingJob {
    pub id: i64,
    pub expected_count: i64,
    pub current_count: i64,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: String,
}

/// Sparse update masks for job rows.
///
/// The set is closed: every write the engine performs is one of these four
/// named operations, so cleared fields can never be resurrected by an
/// unrelated update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobUpdate {
    /// First transition to PROCESSING: status, started_at, finished_at,
    /// error_message.
    MarkRunning,
    /// Resume of an already-PROCESSING row: finished_at, error_message.
    MarkResuming,
    /// Terminal transition: status, finished_at, error_message.
    MarkTerminal,
    /// Per-batch progress: current_count only.
    TickCount,
}

#[derive(Debug, Clone, Default)]
pub struct ListJobsRequest {
    /// Empty means all statuses.
    pub statuses: Vec<JobStatus>,
    pub limit: u64,
    /// Keyset cursor; 0 means the beginning of the list.
    pub cursor: i64,
}

#[derive(Debug, Clone)]
pub struct JobPage {
    pub items: Vec<RandomizingJob>,
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Queued).unwrap(),
            "\"QUEUED\""
        );
        assert_eq!(JobStatus::Processing.as_str(), "PROCESSING");
        assert_eq!("CANCELLED".parse::<JobStatus>().unwrap(), JobStatus::Cancelled);
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_set() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
