//! Worker configuration.

use std::time::Duration;

use crate::poller::PollPolicy;

/// Polling budgets for the asynchronous generation stages.
///
/// Video generation is slower than image generation, so it gets the larger
/// budget by default.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub image_poll: PollPolicy,
    pub video_poll: PollPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            image_poll: PollPolicy::new(Duration::from_secs(5), 60),
            video_poll: PollPolicy::new(Duration::from_secs(10), 60),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            image_poll: PollPolicy::new(
                env_secs("IMAGE_POLL_INTERVAL_SECS").unwrap_or(defaults.image_poll.interval),
                env_u32("IMAGE_POLL_MAX_ATTEMPTS").unwrap_or(defaults.image_poll.max_attempts),
            ),
            video_poll: PollPolicy::new(
                env_secs("VIDEO_POLL_INTERVAL_SECS").unwrap_or(defaults.video_poll.interval),
                env_u32("VIDEO_POLL_MAX_ATTEMPTS").unwrap_or(defaults.video_poll.max_attempts),
            ),
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_budget_exceeds_image_budget() {
        let config = WorkerConfig::default();
        assert!(config.video_poll.budget() > config.image_poll.budget());
        assert_eq!(config.image_poll.budget(), Duration::from_secs(300));
    }
}
