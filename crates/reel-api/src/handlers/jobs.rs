//! Job lifecycle handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use reel_models::{AspectRatio, Job, JobId, JobStatus, Resolution, VideoRequest};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::{is_valid_job_id, validate_source_url};
use crate::state::AppState;

/// Client-facing view of a job.
///
/// The stored artifact reference is never exposed; completed jobs point at
/// the result gateway instead.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_url: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        let result_url = match (job.status, &job.result_ref) {
            (JobStatus::Completed, Some(_)) => Some(result_path(&job.id)),
            _ => None,
        };

        Self {
            job_id: job.id.to_string(),
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
            source_url: job.request.source_url,
            aspect_ratio: job.request.aspect_ratio,
            resolution: job.request.resolution,
            result_url,
            error: job.error,
        }
    }
}

/// Gateway path for a job's result.
pub fn result_path(job_id: &JobId) -> String {
    format!("/results/{}", job_id)
}

/// Create a job and start its pipeline in the background.
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Json<JobResponse>> {
    let Json(mut request) = payload.map_err(|e| ApiError::validation(e.body_text()))?;

    request.source_url = request.source_url.trim().to_string();
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    validate_source_url(&request.source_url)
        .into_result()
        .map_err(ApiError::validation)?;

    let job = state.registry.create(request).await?;
    metrics::record_job_created();

    info!(
        job_id = %job.id,
        source_url = %job.request.source_url,
        aspect_ratio = %job.request.aspect_ratio,
        resolution = %job.request.resolution,
        "Job created"
    );

    // The handle is dropped; the pipeline records its own outcome.
    state.pipeline.spawn(&job);

    Ok(Json(job.into()))
}

/// Get a job's current status.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    if !is_valid_job_id(&job_id) {
        return Err(ApiError::not_found("Job not found"));
    }

    let job = state
        .registry
        .get(&JobId::from_string(job_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(job.into()))
}
