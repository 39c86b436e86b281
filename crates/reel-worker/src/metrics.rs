//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::stage::Stage;

pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "reel_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "reel_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "reel_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "reel_job_duration_seconds";
    pub const STAGE_DURATION_SECONDS: &str = "reel_stage_duration_seconds";
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

pub fn record_job_completed(duration: Duration) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration.as_secs_f64());
}

/// Record a failed job, labelled by failure kind.
pub fn record_job_failed(reason: &'static str) {
    counter!(names::JOBS_FAILED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_stage_duration(stage: Stage, duration: Duration) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.as_str())
        .record(duration.as_secs_f64());
}
