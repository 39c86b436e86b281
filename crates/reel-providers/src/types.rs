//! Shared types for asynchronous generation providers.

use std::fmt;

use reel_models::{AspectRatio, Resolution};

/// Provider-side identifier of a running generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationHandle(pub String);

impl GenerationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by a generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    /// Still running
    Pending,
    /// Finished; carries the artifact URL
    Succeeded(String),
    /// Provider gave up or refused (e.g. content policy)
    Failed(String),
}

impl GenerationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationStatus::Pending)
    }
}

/// Result of the initiating call.
///
/// Some providers finish synchronously, in which case `status` is already
/// terminal and no polling is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub handle: GenerationHandle,
    pub status: GenerationStatus,
}

impl Submission {
    pub fn pending(handle: GenerationHandle) -> Self {
        Self {
            handle,
            status: GenerationStatus::Pending,
        }
    }
}

/// Input for image-to-video generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInput {
    pub image_url: String,
    pub script: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}
