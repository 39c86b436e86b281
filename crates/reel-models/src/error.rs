//! Model error types.

use thiserror::Error;

use crate::JobStatus;

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid job transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}
