//! Background pruning of finished jobs.
//!
//! The registry is process-local and unbounded. When `JOB_RETENTION_SECS` is
//! set, this service periodically drops terminal jobs whose last transition
//! is older than the retention window. Queued and processing jobs are never
//! touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};

use reel_registry::JobRegistry;

use crate::metrics;

/// Upper bound between sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Retention sweeper service.
pub struct RetentionSweeper {
    registry: Arc<dyn JobRegistry>,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(registry: Arc<dyn JobRegistry>, retention: Duration) -> Self {
        Self {
            registry,
            retention,
        }
    }

    /// Start the sweep loop. Runs indefinitely; spawn it as a background task.
    pub async fn run(&self) {
        let period = self.retention.min(MAX_SWEEP_INTERVAL);
        info!(
            retention_secs = self.retention.as_secs(),
            "Starting job retention sweeper (interval: {:?})", period
        );

        let mut ticker = interval(period);
        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep_once().await {
                error!("Job retention sweep error: {}", e);
            }
        }
    }

    /// Run a single sweep. Returns the number of jobs removed.
    pub async fn sweep_once(&self) -> anyhow::Result<usize> {
        let retention = chrono::Duration::from_std(self.retention)?;
        let cutoff = Utc::now() - retention;

        let removed = self.registry.prune_terminal(cutoff).await?;
        let remaining = self.registry.len().await?;
        metrics::set_registry_jobs(remaining);

        if removed > 0 {
            metrics::record_jobs_pruned(removed);
            info!(removed, remaining, "Pruned expired jobs");
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use reel_models::{JobTransition, VideoRequest};
    use reel_registry::InMemoryJobRegistry;

    use super::*;

    #[tokio::test]
    async fn test_sweep_removes_only_expired_terminal_jobs() {
        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());

        let finished = registry
            .create(VideoRequest::new("https://example.com/a.md"))
            .await
            .unwrap();
        registry.update(&finished.id, JobTransition::Start).await.unwrap();
        registry
            .update(
                &finished.id,
                JobTransition::Fail {
                    error: "boom".into(),
                },
            )
            .await
            .unwrap();
        let running = registry
            .create(VideoRequest::new("https://example.com/b.md"))
            .await
            .unwrap();

        let keep_all = RetentionSweeper::new(Arc::clone(&registry), Duration::from_secs(3600));
        assert_eq!(keep_all.sweep_once().await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let sweeper = RetentionSweeper::new(Arc::clone(&registry), Duration::from_millis(10));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);

        assert!(registry.get(&finished.id).await.unwrap().is_none());
        assert!(registry.get(&running.id).await.unwrap().is_some());
    }
}
