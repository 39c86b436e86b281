//! In-memory registry.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use reel_models::{Job, JobId, JobTransition, VideoRequest};

use crate::error::{RegistryError, RegistryResult};
use crate::registry::JobRegistry;

/// Process-local job store. Records are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn create(&self, request: VideoRequest) -> RegistryResult<Job> {
        let mut jobs = self.jobs.write().await;

        // Uuid v4 collisions are not a practical concern, but never overwrite.
        let mut job = Job::new(request);
        while jobs.contains_key(&job.id) {
            job.id = JobId::new();
        }

        jobs.insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, "Registered job");
        Ok(job)
    }

    async fn get(&self, id: &JobId) -> RegistryResult<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn update(&self, id: &JobId, transition: JobTransition) -> RegistryResult<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| RegistryError::JobNotFound(id.clone()))?;

        transition.apply(job)?;
        debug!(job_id = %id, status = %job.status, "Job transitioned");
        Ok(job.clone())
    }

    async fn len(&self) -> RegistryResult<usize> {
        Ok(self.jobs.read().await.len())
    }

    async fn prune_terminal(&self, cutoff: DateTime<Utc>) -> RegistryResult<usize> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !(job.is_terminal() && job.updated_at < cutoff));
        Ok(before - jobs.len())
    }
}
