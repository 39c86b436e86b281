//! Contracts for the remote operations the pipeline consumes.

use std::sync::Arc;

use async_trait::async_trait;
use reel_models::AspectRatio;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::types::{GenerationHandle, GenerationStatus, Submission, VideoInput};
use crate::{GeminiClient, HttpSourceFetcher, ReplicateClient};

/// Fetches raw changelog text.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fails with [`crate::ProviderError::Fetch`] on non-2xx or network fault.
    async fn fetch_source(&self, url: &str) -> ProviderResult<String>;
}

/// Language-model operations producing the narration script and the visual prompt.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn summarize(&self, changelog: &str) -> ProviderResult<String>;

    async fn derive_prompt(&self, script: &str) -> ProviderResult<String>;
}

/// Asynchronous image generation.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn start(&self, prompt: &str, aspect_ratio: AspectRatio) -> ProviderResult<Submission>;

    async fn poll(&self, handle: &GenerationHandle) -> ProviderResult<GenerationStatus>;
}

/// Asynchronous image-to-video generation.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn start(&self, input: &VideoInput) -> ProviderResult<Submission>;

    async fn poll(&self, handle: &GenerationHandle) -> ProviderResult<GenerationStatus>;
}

/// The full set of collaborators one pipeline run needs.
#[derive(Clone)]
pub struct Providers {
    pub source: Arc<dyn SourceFetcher>,
    pub script: Arc<dyn ScriptWriter>,
    pub image: Arc<dyn ImageGenerator>,
    pub video: Arc<dyn VideoGenerator>,
}

impl Providers {
    /// Build the HTTP-backed providers.
    ///
    /// A provider whose credential is missing is replaced by one that fails
    /// every call with [`ProviderError::Config`], so the server can still start
    /// and report itself not ready.
    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        let (script, video): (Arc<dyn ScriptWriter>, Arc<dyn VideoGenerator>) =
            if config.gemini_api_key.is_some() {
                let gemini = Arc::new(GeminiClient::new(config)?);
                (Arc::clone(&gemini) as Arc<dyn ScriptWriter>, gemini as Arc<dyn VideoGenerator>)
            } else {
                let missing = Arc::new(MissingCredential("GEMINI_API_KEY"));
                (Arc::clone(&missing) as Arc<dyn ScriptWriter>, missing as Arc<dyn VideoGenerator>)
            };

        let image: Arc<dyn ImageGenerator> = if config.replicate_api_token.is_some() {
            Arc::new(ReplicateClient::new(config)?)
        } else {
            Arc::new(MissingCredential("REPLICATE_API_TOKEN"))
        };

        Ok(Self {
            source: Arc::new(HttpSourceFetcher::new(config)?),
            script,
            image,
            video,
        })
    }
}

/// Stand-in for a provider whose credential variable is unset.
struct MissingCredential(&'static str);

impl MissingCredential {
    fn error(&self) -> ProviderError {
        ProviderError::config(format!("{} not set", self.0))
    }
}

#[async_trait]
impl ScriptWriter for MissingCredential {
    async fn summarize(&self, _changelog: &str) -> ProviderResult<String> {
        Err(self.error())
    }

    async fn derive_prompt(&self, _script: &str) -> ProviderResult<String> {
        Err(self.error())
    }
}

#[async_trait]
impl ImageGenerator for MissingCredential {
    async fn start(&self, _prompt: &str, _aspect_ratio: AspectRatio) -> ProviderResult<Submission> {
        Err(self.error())
    }

    async fn poll(&self, _handle: &GenerationHandle) -> ProviderResult<GenerationStatus> {
        Err(self.error())
    }
}

#[async_trait]
impl VideoGenerator for MissingCredential {
    async fn start(&self, _input: &VideoInput) -> ProviderResult<Submission> {
        Err(self.error())
    }

    async fn poll(&self, _handle: &GenerationHandle) -> ProviderResult<GenerationStatus> {
        Err(self.error())
    }
}
