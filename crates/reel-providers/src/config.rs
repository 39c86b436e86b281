//! Provider configuration.

use std::time::Duration;

/// Credentials and endpoints for the remote providers.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Gemini API key (text + Veo video, and result downloads)
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_text_model: String,
    pub veo_model: String,
    /// Replicate API token (image generation)
    pub replicate_api_token: Option<String>,
    pub replicate_base_url: String,
    pub replicate_image_model: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_text_model: "gemini-2.5-flash".to_string(),
            veo_model: "veo-3.0-generate-001".to_string(),
            replicate_api_token: None,
            replicate_base_url: "https://api.replicate.com".to_string(),
            replicate_image_model: "black-forest-labs/flux-schnell".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ProviderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_base_url: non_empty_var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            gemini_text_model: non_empty_var("GEMINI_TEXT_MODEL")
                .unwrap_or(defaults.gemini_text_model),
            veo_model: non_empty_var("VEO_MODEL").unwrap_or(defaults.veo_model),
            replicate_api_token: non_empty_var("REPLICATE_API_TOKEN"),
            replicate_base_url: non_empty_var("REPLICATE_BASE_URL")
                .unwrap_or(defaults.replicate_base_url),
            replicate_image_model: non_empty_var("REPLICATE_IMAGE_MODEL")
                .unwrap_or(defaults.replicate_image_model),
            request_timeout: std::env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }

    /// Whether every credential the pipeline needs is present.
    pub fn is_configured(&self) -> bool {
        self.gemini_api_key.is_some() && self.replicate_api_token.is_some()
    }
}

// Keys must never end up in logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_text_model", &self.gemini_text_model)
            .field("veo_model", &self.veo_model)
            .field(
                "replicate_api_token",
                &self.replicate_api_token.as_ref().map(|_| "***"),
            )
            .field("replicate_base_url", &self.replicate_base_url)
            .field("replicate_image_model", &self.replicate_image_model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_credentials() {
        let config = ProviderConfig {
            gemini_api_key: Some("AIza-secret".into()),
            replicate_api_token: Some("r8_secret".into()),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("AIza-secret"));
        assert!(!rendered.contains("r8_secret"));
        assert!(config.is_configured());
    }
}
