//! Job record and lifecycle transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{JobStatus, TransitionError, VideoRequest};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One request's worth of pipeline execution.
///
/// `result_ref` is only ever present on a `completed` job and `error` only on
/// a `failed` one. Both are written exactly once, by [`JobTransition::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub request: VideoRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// Create a new queued job with a fresh id.
    pub fn new(request: VideoRequest) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            request,
            result_ref: None,
            error: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Atomic mutation applied to a job record by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTransition {
    /// `queued -> processing`
    Start,
    /// `processing -> completed`, recording the artifact reference
    Complete { result_ref: String },
    /// `processing -> failed`, recording the failure description
    Fail { error: String },
}

impl JobTransition {
    /// Status the job ends up in after this transition.
    pub fn target(&self) -> JobStatus {
        match self {
            JobTransition::Start => JobStatus::Processing,
            JobTransition::Complete { .. } => JobStatus::Completed,
            JobTransition::Fail { .. } => JobStatus::Failed,
        }
    }

    /// Apply to `job`, leaving it untouched if the state machine forbids it.
    pub fn apply(self, job: &mut Job) -> Result<(), TransitionError> {
        let to = self.target();
        if !job.status.can_transition_to(to) {
            return Err(TransitionError {
                from: job.status,
                to,
            });
        }

        match self {
            JobTransition::Start => {}
            JobTransition::Complete { result_ref } => job.result_ref = Some(result_ref),
            JobTransition::Fail { error } => job.error = Some(error),
        }
        job.status = to;
        job.updated_at = Utc::now();
        Ok(())
    }
}
