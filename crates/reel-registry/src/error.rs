//! Registry error types.

use reel_models::{JobId, TransitionError};
use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::JobNotFound(_))
    }
}
