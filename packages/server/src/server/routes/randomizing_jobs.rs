//! HTTP facade over the randomizing job engine.

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::ServiceError;
use crate::domains::randomizing_jobs::{JobPage, JobStatus, ListJobsRequest, RandomizingJob};
use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub expected_count: i64,
}

#[derive(Serialize)]
pub struct CreateJobResponse {
    pub job_id: i64,
}

pub async fn create_job_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    let job_id = state.randomizing_jobs.create(req.expected_count).await?;
    Ok((StatusCode::CREATED, Json(CreateJobResponse { job_id })))
}

#[derive(Deserialize)]
pub struct CancelJobRequest {
    pub id: i64,
}

#[derive(Serialize)]
pub struct CancelJobResponse {
    pub success: bool,
}

pub async fn cancel_job_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<CancelJobRequest>,
) -> ApiResult<Json<CancelJobResponse>> {
    state.randomizing_jobs.cancel(req.id).await?;
    Ok(Json(CancelJobResponse { success: true }))
}

#[derive(Serialize)]
pub struct JobItem {
    pub id: i64,
    pub expected_count: i64,
    pub current_count: i64,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: String,
}

impl From<RandomizingJob> for JobItem {
    fn from(job: RandomizingJob) -> Self {
        Self {
            id: job.id,
            expected_count: job.expected_count,
            current_count: job.current_count,
            status: job.status,
            started_at: job.started_at,
            finished_at: job.finished_at,
            error_message: job.error_message,
        }
    }
}

#[derive(Serialize)]
pub struct ListJobsResponse {
    pub items: Vec<JobItem>,
    pub has_next: bool,
}

impl From<JobPage> for ListJobsResponse {
    fn from(page: JobPage) -> Self {
        Self {
            items: page.items.into_iter().map(JobItem::from).collect(),
            has_next: page.has_next,
        }
    }
}

/// `status` may repeat, so the query string is read as raw pairs.
/// Unrecognised status values are skipped.
pub async fn list_jobs_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<ListJobsResponse>> {
    let mut req = ListJobsRequest::default();

    for (key, value) in params {
        match key.as_str() {
            "limit" => {
                req.limit = value.parse().map_err(|_| {
                    ServiceError::bad_request("limit must be a non-negative integer")
                })?;
            }
            "cursor" => {
                req.cursor = value
                    .parse()
                    .map_err(|_| ServiceError::bad_request("cursor must be an integer"))?;
            }
            "status" => {
                if let Ok(status) = value.parse::<JobStatus>() {
                    req.statuses.push(status);
                }
            }
            _ => {}
        }
    }

    let page = state.randomizing_jobs.get_list(req).await?;
    Ok(Json(ListJobsResponse::from(page)))
}
