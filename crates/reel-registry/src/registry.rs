//! Registry capability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use reel_models::{Job, JobId, JobTransition, VideoRequest};

use crate::error::RegistryResult;

/// Keyed store of job records.
///
/// Implementations must make [`JobRegistry::update`] an atomic
/// read-modify-write: a status read racing a pipeline write observes either
/// the old or the new record, never a partial one.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Register a new `queued` job under a freshly allocated id.
    async fn create(&self, request: VideoRequest) -> RegistryResult<Job>;

    /// Look up a job. `Ok(None)` means the id is unknown.
    async fn get(&self, id: &JobId) -> RegistryResult<Option<Job>>;

    /// Apply a lifecycle transition and return the updated record.
    async fn update(&self, id: &JobId, transition: JobTransition) -> RegistryResult<Job>;

    /// Number of records currently held.
    async fn len(&self) -> RegistryResult<usize>;

    /// Remove terminal jobs last updated before `cutoff`. Returns the count removed.
    async fn prune_terminal(&self, cutoff: DateTime<Utc>) -> RegistryResult<usize>;
}
