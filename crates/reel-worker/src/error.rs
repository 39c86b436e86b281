//! Pipeline error types.

use std::time::Duration;

use reel_providers::ProviderError;
use thiserror::Error;

use crate::stage::Stage;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Reason a job ended up `failed`. The `Display` output is what the job records.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A remote call errored or was rejected outright.
    #[error("{stage} failed: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    /// Polling budget exhausted without a terminal provider status.
    #[error("{stage} timed out after {attempts} status checks ({waited:?})")]
    Timeout {
        stage: Stage,
        attempts: u32,
        waited: Duration,
    },

    /// The provider reported a terminal failure (e.g. content policy).
    #[error("{stage} failed: {reason}")]
    GenerationFailed { stage: Stage, reason: String },

    #[error("Changelog is empty")]
    EmptySource,
}

impl PipelineError {
    pub fn provider(stage: Stage, source: ProviderError) -> Self {
        Self::Provider { stage, source }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Provider { source, .. } if source.is_rejection() => "rejected",
            PipelineError::Provider {
                source: ProviderError::Fetch(_),
                ..
            } => "fetch",
            PipelineError::Provider { .. } => "provider",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::GenerationFailed { .. } => "generation_failed",
            PipelineError::EmptySource => "empty_source",
        }
    }
}
