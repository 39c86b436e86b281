//! Pipeline stages.

use std::fmt;

/// One step of a job's pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    FetchSource,
    Summarize,
    DerivePrompt,
    GenerateImage,
    GenerateVideo,
}

impl Stage {
    /// Stable identifier used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FetchSource => "fetch_source",
            Stage::Summarize => "summarize",
            Stage::DerivePrompt => "derive_prompt",
            Stage::GenerateImage => "generate_image",
            Stage::GenerateVideo => "generate_video",
        }
    }

    /// Human-readable description used in job error messages.
    pub fn description(&self) -> &'static str {
        match self {
            Stage::FetchSource => "Fetching changelog",
            Stage::Summarize => "Writing script",
            Stage::DerivePrompt => "Deriving visual prompt",
            Stage::GenerateImage => "Generating image",
            Stage::GenerateVideo => "Generating video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
