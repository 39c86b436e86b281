//! Structured job logging.
//!
//! Every line a pipeline run emits carries the job id and the operation, so
//! one job can be followed through interleaved output.

use tracing::{error, info, warn, Span};

use reel_models::JobId;

use crate::stage::Stage;

/// Job logger with the job id and operation attached to each event.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    /// Create a logger for a job and operation (e.g. `"changelog_video"`).
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: Stage) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = stage.as_str(),
            "Job progress: {}", stage.description()
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering a whole pipeline run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "changelog_video");

        assert_eq!(logger.job_id(), job_id.as_str());
        assert_eq!(logger.operation(), "changelog_video");
    }
}
