//! Stage invoker: bounded polling of asynchronous provider operations.
//!
//! An invocation issues the initiating call and, unless the provider already
//! answered with a terminal status, re-checks every `interval` until a
//! terminal status arrives or `max_attempts` checks have been spent. Errors
//! from either call end the invocation immediately; there is no retry.

use std::future::Future;
use std::time::Duration;

use reel_providers::{GenerationHandle, GenerationStatus, ProviderResult, Submission};
use tracing::{debug, error, warn};

use crate::stage::Stage;

/// Polling budget for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before each status check.
    pub interval: Duration,
    /// Maximum number of status checks.
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Worst-case time spent waiting: `interval * max_attempts`.
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Terminal result of a polled stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Artifact reference returned by the provider.
    Succeeded(String),
    /// Provider-reported terminal failure.
    Failed(String),
    /// Budget exhausted while the provider still reported `pending`.
    TimedOut { attempts: u32, waited: Duration },
}

/// Run one asynchronous provider operation to a terminal outcome.
///
/// `start` issues the initiating call; `poll` re-checks the status for the
/// returned handle.
pub async fn invoke_stage<S, SFut, P, PFut>(
    stage: Stage,
    policy: &PollPolicy,
    start: S,
    poll: P,
) -> ProviderResult<PollOutcome>
where
    S: FnOnce() -> SFut,
    SFut: Future<Output = ProviderResult<Submission>>,
    P: Fn(GenerationHandle) -> PFut,
    PFut: Future<Output = ProviderResult<GenerationStatus>>,
{
    let Submission { handle, mut status } = start().await?;
    debug!(stage = stage.as_str(), handle = %handle, "Submitted generation");

    let mut attempts = 0u32;
    loop {
        match status {
            GenerationStatus::Succeeded(url) => return Ok(PollOutcome::Succeeded(url)),
            GenerationStatus::Failed(reason) => {
                error!(
                    stage = stage.as_str(),
                    handle = %handle,
                    reason = %reason,
                    "Generation failed"
                );
                return Ok(PollOutcome::Failed(reason));
            }
            GenerationStatus::Pending => {}
        }

        if attempts >= policy.max_attempts {
            let waited = policy.interval.saturating_mul(attempts);
            warn!(
                stage = stage.as_str(),
                handle = %handle,
                attempts,
                waited_secs = waited.as_secs_f64(),
                "Generation timed out"
            );
            return Ok(PollOutcome::TimedOut { attempts, waited });
        }

        tokio::time::sleep(policy.interval).await;
        attempts += 1;
        status = poll(handle.clone()).await?;
        debug!(
            stage = stage.as_str(),
            handle = %handle,
            attempt = attempts,
            terminal = status.is_terminal(),
            "Polled generation status"
        );
    }
}
