//! Pipeline orchestrator.
//!
//! Drives one job through its stages in strict sequence and records the
//! outcome in the registry. Each job runs on its own task; the registry handle
//! is the only state shared between runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{error, Instrument};

use reel_models::{strip_credentials, Job, JobId, JobTransition, VideoRequest};
use reel_providers::{
    extract_relevant_section, GenerationHandle, GenerationStatus, Providers, ProviderResult,
    Submission, VideoInput,
};
use reel_registry::JobRegistry;

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::poller::{invoke_stage, PollOutcome, PollPolicy};
use crate::stage::Stage;

const OPERATION: &str = "changelog_video";

/// Recorded on jobs whose task panicked.
const INTERNAL_ERROR: &str = "Internal error while processing job";

/// Executes jobs against a set of providers.
pub struct Pipeline {
    registry: Arc<dyn JobRegistry>,
    providers: Providers,
    config: WorkerConfig,
}

impl Pipeline {
    pub fn new(registry: Arc<dyn JobRegistry>, providers: Providers, config: WorkerConfig) -> Self {
        Self {
            registry,
            providers,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<dyn JobRegistry> {
        &self.registry
    }

    /// Start a job in the background and return immediately.
    ///
    /// The returned handle resolves once the job has reached a terminal state.
    /// If the run panics the job is still recorded as `failed`.
    pub fn spawn(self: &Arc<Self>, job: &Job) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        let job_id = job.id.clone();
        let request = job.request.clone();

        tokio::spawn(async move {
            let run = tokio::spawn({
                let pipeline = Arc::clone(&pipeline);
                let job_id = job_id.clone();
                async move { pipeline.run(&job_id, &request).await }
            });

            if let Err(e) = run.await {
                if e.is_panic() {
                    error!(job_id = %job_id, "Job task panicked");
                    pipeline.fail_after_panic(&job_id).await;
                }
            }
        })
    }

    /// Run a job to completion: `processing`, then `completed` or `failed`.
    pub async fn run(&self, job_id: &JobId, request: &VideoRequest) {
        let logger = JobLogger::new(job_id, OPERATION);
        let span = logger.create_span();

        async {
            if let Err(e) = self.registry.update(job_id, JobTransition::Start).await {
                logger.log_error(&format!("Could not start job: {}", e));
                return;
            }
            metrics::record_job_started();
            logger.log_start(&request.source_url);

            let started = Instant::now();
            let transition = match self.execute(request, &logger).await {
                Ok(video_ref) => {
                    metrics::record_job_completed(started.elapsed());
                    logger.log_completion("video ready");
                    JobTransition::Complete {
                        result_ref: strip_credentials(&video_ref),
                    }
                }
                Err(err) => {
                    metrics::record_job_failed(err.kind());
                    match err {
                        PipelineError::Timeout { .. } => logger.log_warning(&err.to_string()),
                        _ => logger.log_error(&err.to_string()),
                    }
                    JobTransition::Fail {
                        error: err.to_string(),
                    }
                }
            };

            if let Err(e) = self.registry.update(job_id, transition).await {
                logger.log_error(&format!("Could not record job outcome: {}", e));
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, request: &VideoRequest, logger: &JobLogger) -> PipelineResult<String> {
        let changelog = self
            .timed(
                Stage::FetchSource,
                logger,
                self.providers.source.fetch_source(&request.source_url),
            )
            .await?;
        let section = extract_relevant_section(&changelog);
        if section.is_empty() {
            return Err(PipelineError::EmptySource);
        }

        let script = self
            .timed(Stage::Summarize, logger, self.providers.script.summarize(&section))
            .await?;
        let prompt = self
            .timed(
                Stage::DerivePrompt,
                logger,
                self.providers.script.derive_prompt(&script),
            )
            .await?;

        let image = &self.providers.image;
        let image_url = self
            .polled(
                Stage::GenerateImage,
                &self.config.image_poll,
                logger,
                || image.start(&prompt, request.aspect_ratio),
                move |handle| async move { image.poll(&handle).await },
            )
            .await?;

        let input = VideoInput {
            image_url,
            script,
            aspect_ratio: request.aspect_ratio,
            resolution: request.resolution,
        };
        let video = &self.providers.video;
        self.polled(
            Stage::GenerateVideo,
            &self.config.video_poll,
            logger,
            || video.start(&input),
            move |handle| async move { video.poll(&handle).await },
        )
        .await
    }

    /// Run a single-call stage.
    async fn timed<T>(
        &self,
        stage: Stage,
        logger: &JobLogger,
        call: impl Future<Output = ProviderResult<T>>,
    ) -> PipelineResult<T> {
        logger.log_stage(stage);
        let started = Instant::now();
        let result = call.await;
        metrics::record_stage_duration(stage, started.elapsed());
        result.map_err(|e| PipelineError::provider(stage, e))
    }

    /// Run an asynchronous generation stage through the stage invoker.
    async fn polled<S, SFut, P, PFut>(
        &self,
        stage: Stage,
        policy: &PollPolicy,
        logger: &JobLogger,
        start: S,
        poll: P,
    ) -> PipelineResult<String>
    where
        S: FnOnce() -> SFut,
        SFut: Future<Output = ProviderResult<Submission>>,
        P: Fn(GenerationHandle) -> PFut,
        PFut: Future<Output = ProviderResult<GenerationStatus>>,
    {
        logger.log_stage(stage);
        let started = Instant::now();
        let outcome = invoke_stage(stage, policy, start, poll).await;
        metrics::record_stage_duration(stage, started.elapsed());

        match outcome.map_err(|e| PipelineError::provider(stage, e))? {
            PollOutcome::Succeeded(url) => Ok(url),
            PollOutcome::Failed(reason) => Err(PipelineError::GenerationFailed { stage, reason }),
            PollOutcome::TimedOut { attempts, waited } => Err(PipelineError::Timeout {
                stage,
                attempts,
                waited,
            }),
        }
    }

    async fn fail_after_panic(&self, job_id: &JobId) {
        // A panic before the first transition leaves the job queued.
        let _ = self.registry.update(job_id, JobTransition::Start).await;

        let fail = JobTransition::Fail {
            error: INTERNAL_ERROR.to_string(),
        };
        if let Err(e) = self.registry.update(job_id, fail).await {
            error!(job_id = %job_id, error = %e, "Could not mark panicked job as failed");
        }
    }
}
