//! Video generation request.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Maximum accepted length of a source URL.
pub const MAX_SOURCE_URL_LENGTH: usize = 2048;

/// Output aspect ratio supported by the video model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    /// Landscape (16:9)
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// Portrait (9:16) for Shorts/Reels
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output resolution supported by the video model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "1080p")]
    FullHd,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd => "720p",
            Resolution::FullHd => "1080p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload for a new video job. Immutable once stored on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct VideoRequest {
    /// Changelog location (raw markdown or a GitHub blob URL)
    #[validate(url, length(max = 2048))]
    pub source_url: String,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    #[serde(default)]
    pub resolution: Resolution,
}

impl VideoRequest {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_when_omitted() {
        let req: VideoRequest =
            serde_json::from_str(r#"{"source_url":"https://example.com/CHANGELOG.md"}"#).unwrap();
        assert_eq!(req.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(req.resolution, Resolution::Hd);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_wire_format() {
        let req: VideoRequest = serde_json::from_str(
            r#"{"source_url":"https://example.com/c.md","aspect_ratio":"9:16","resolution":"1080p"}"#,
        )
        .unwrap();
        assert_eq!(req.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(req.resolution, Resolution::FullHd);

        let unsupported = serde_json::from_str::<VideoRequest>(
            r#"{"source_url":"https://example.com/c.md","aspect_ratio":"4:3"}"#,
        );
        assert!(unsupported.is_err());
    }

    #[test]
    fn test_invalid_url_fails_validation() {
        assert!(VideoRequest::new("not a url").validate().is_err());
        let long = format!("https://example.com/{}", "a".repeat(2100));
        assert!(VideoRequest::new(long).validate().is_err());
    }
}
