//! Remote collaborators of the video pipeline.
//!
//! This crate provides:
//! - Trait contracts for the four remote operations the pipeline consumes
//! - Changelog fetching and version-section extraction
//! - Gemini client (script writing, Veo video generation)
//! - Replicate client (image generation)

pub mod changelog;
pub mod config;
pub mod error;
pub mod gemini;
mod http;
pub mod prompts;
pub mod replicate;
pub mod traits;
pub mod types;

pub use changelog::{extract_relevant_section, normalize_source_url, HttpSourceFetcher};
pub use config::ProviderConfig;
pub use error::{ProviderError, ProviderResult};
pub use gemini::GeminiClient;
pub use replicate::ReplicateClient;
pub use traits::{ImageGenerator, Providers, ScriptWriter, SourceFetcher, VideoGenerator};
pub use types::{GenerationHandle, GenerationStatus, Submission, VideoInput};
