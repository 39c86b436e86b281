//! Result download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;

use reel_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::security::is_valid_job_id;
use crate::state::AppState;

/// Stream a completed job's video through the result gateway.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    if !is_valid_job_id(&job_id) {
        return Err(ApiError::not_found("Result not found"));
    }

    let download = state.gateway.open(&JobId::from_string(job_id)).await?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &download.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.filename),
        )
        .header(header::CACHE_CONTROL, "private, no-store");
    if let Some(length) = download.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(download.response.bytes_stream()))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
