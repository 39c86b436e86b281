//! Gemini API client.
//!
//! Covers both language-model stages (`generateContent`) and Veo
//! image-to-video generation (`predictLongRunning` + operation polling).

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{error_chain, read_capped};
use crate::prompts::{build_summary_prompt, build_video_prompt, build_visual_prompt, clean_model_text};
use crate::traits::{ScriptWriter, VideoGenerator};
use crate::types::{GenerationHandle, GenerationStatus, Submission, VideoInput};

const GEMINI: &str = "Gemini";
const VEO: &str = "Veo";

/// Largest source frame sent inline to Veo.
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Finish reasons that mean the model refused to answer.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
];

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    text_model: String,
    veo_model: String,
    client: Client,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Long-running operation returned by Veo.
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| ProviderError::config("GEMINI_API_KEY not set"))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            text_model: config.gemini_text_model.clone(),
            veo_model: config.veo_model.clone(),
            client,
        })
    }

    /// Call `generateContent` and return the cleaned text of the first candidate.
    async fn generate_text(&self, prompt: String) -> ProviderResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.text_model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature: 0.7 },
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::request(GEMINI, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::api(GEMINI, status, &body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(GEMINI, e.to_string()))?;

        extract_text(parsed)
    }

    async fn fetch_image(&self, image_url: &str) -> ProviderResult<(String, String)> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| ProviderError::request(VEO, format!("image download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::api(
                VEO,
                response.status().as_u16(),
                "image download failed",
            ));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or("image/png")
            .to_string();

        let bytes = read_capped(response, MAX_IMAGE_BYTES).await.map_err(|e| {
            ProviderError::request(VEO, format!("image download failed: {}", error_chain(&e)))
        })?;

        debug!(bytes = bytes.len(), mime_type = %mime_type, "Downloaded source frame");
        Ok((BASE64.encode(&bytes), mime_type))
    }

    async fn send_operation(&self, request: reqwest::RequestBuilder) -> ProviderResult<Operation> {
        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::request(VEO, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::api(VEO, status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(VEO, e.to_string()))
    }
}

#[async_trait]
impl ScriptWriter for GeminiClient {
    async fn summarize(&self, changelog: &str) -> ProviderResult<String> {
        let script = self.generate_text(build_summary_prompt(changelog)).await?;
        info!(model = %self.text_model, chars = script.len(), "Generated narration script");
        Ok(script)
    }

    async fn derive_prompt(&self, script: &str) -> ProviderResult<String> {
        self.generate_text(build_visual_prompt(script)).await
    }
}

#[async_trait]
impl VideoGenerator for GeminiClient {
    async fn start(&self, input: &VideoInput) -> ProviderResult<Submission> {
        let (image_b64, mime_type) = self.fetch_image(&input.image_url).await?;

        let body = json!({
            "instances": [{
                "prompt": build_video_prompt(&input.script),
                "image": {
                    "bytesBase64Encoded": image_b64,
                    "mimeType": mime_type,
                },
            }],
            "parameters": {
                "aspectRatio": input.aspect_ratio.as_str(),
                "resolution": input.resolution.as_str(),
            },
        });

        let url = format!(
            "{}/v1beta/models/{}:predictLongRunning",
            self.base_url, self.veo_model
        );
        let operation = self.send_operation(self.client.post(&url).json(&body)).await?;

        info!(operation = %operation.name, model = %self.veo_model, "Started video generation");
        Ok(Submission {
            handle: GenerationHandle::new(operation.name.clone()),
            status: operation_status(operation),
        })
    }

    async fn poll(&self, handle: &GenerationHandle) -> ProviderResult<GenerationStatus> {
        let url = format!(
            "{}/v1beta/{}",
            self.base_url,
            handle.as_str().trim_start_matches('/')
        );
        let operation = self.send_operation(self.client.get(&url)).await?;
        Ok(operation_status(operation))
    }
}

fn extract_text(response: GenerateContentResponse) -> ProviderResult<String> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
    {
        warn!(reason = %reason, "Gemini blocked the prompt");
        return Err(ProviderError::rejected(
            GEMINI,
            format!("prompt blocked ({})", reason),
        ));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::invalid_response(GEMINI, "no candidates"))?;

    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
    {
        warn!(reason = %reason, "Gemini blocked the response");
        return Err(ProviderError::rejected(
            GEMINI,
            format!("response blocked ({})", reason),
        ));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = clean_model_text(&text);
    if text.is_empty() {
        return Err(ProviderError::invalid_response(GEMINI, "empty content"));
    }
    Ok(text)
}

fn operation_status(operation: Operation) -> GenerationStatus {
    if !operation.done {
        return GenerationStatus::Pending;
    }

    if let Some(error) = operation.error {
        return GenerationStatus::Failed(error.message);
    }

    let Some(video) = operation
        .response
        .and_then(|r| r.generate_video_response)
    else {
        return GenerationStatus::Failed("operation finished without a response".to_string());
    };

    if !video.rai_media_filtered_reasons.is_empty() {
        return GenerationStatus::Failed(format!(
            "content filtered: {}",
            video.rai_media_filtered_reasons.join("; ")
        ));
    }

    match video
        .generated_samples
        .into_iter()
        .find_map(|s| s.video.and_then(|v| v.uri))
    {
        Some(uri) => GenerationStatus::Succeeded(uri),
        None => GenerationStatus::Failed("operation finished without a video".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use reel_models::{AspectRatio, Resolution};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> GeminiClient {
        let config = ProviderConfig {
            gemini_api_key: Some("test-key".into()),
            gemini_base_url: server.uri(),
            ..Default::default()
        };
        GeminiClient::new(&config).unwrap()
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = GeminiClient::new(&ProviderConfig::default()).err().unwrap();
        assert!(matches!(err, ProviderError::Config(_)));
    }

    #[tokio::test]
    async fn test_summarize_returns_clean_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "```\nDark mode is here.\n```"}]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let script = client_for(&server).summarize("## 1.0\n- dark mode").await.unwrap();
        assert_eq!(script, "Dark mode is here.");
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).summarize("text").await.unwrap_err();
        assert!(err.is_rejection());
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_safety_finish_reason_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"finishReason": "PROHIBITED_CONTENT"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).derive_prompt("script").await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_http_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).summarize("text").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_video_start_and_poll() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/frame.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/veo-3.0-generate-001:predictLongRunning"))
            .and(body_partial_json(json!({
                "instances": [{"image": {"bytesBase64Encoded": "AQID", "mimeType": "image/png"}}],
                "parameters": {"aspectRatio": "9:16", "resolution": "1080p"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "models/veo-3.0-generate-001/operations/op1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models/veo-3.0-generate-001/operations/op1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "models/veo-3.0-generate-001/operations/op1",
                "done": true,
                "response": {"generateVideoResponse": {"generatedSamples": [
                    {"video": {"uri": "https://generativelanguage.googleapis.com/v1beta/files/f1:download?alt=media"}}
                ]}}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let submission = client
            .start(&VideoInput {
                image_url: format!("{}/frame.png", server.uri()),
                script: "Dark mode is here.".into(),
                aspect_ratio: AspectRatio::Portrait,
                resolution: Resolution::FullHd,
            })
            .await
            .unwrap();
        assert_eq!(submission.status, GenerationStatus::Pending);

        let status = client.poll(&submission.handle).await.unwrap();
        assert_eq!(
            status,
            GenerationStatus::Succeeded(
                "https://generativelanguage.googleapis.com/v1beta/files/f1:download?alt=media"
                    .into()
            )
        );
    }

    #[tokio::test]
    async fn test_oversized_source_frame_is_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/frame.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0u8; MAX_IMAGE_BYTES + 1]),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "op"})))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .start(&VideoInput {
                image_url: format!("{}/frame.png", server.uri()),
                script: "Dark mode is here.".into(),
                aspect_ratio: AspectRatio::Landscape,
                resolution: Resolution::Hd,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Request { provider: VEO, .. }));
        assert!(err.to_string().contains("exceeds"), "{err}");
    }

    #[test]
    fn test_filtered_operation_is_failure() {
        let operation: Operation = serde_json::from_value(json!({
            "name": "op",
            "done": true,
            "response": {"generateVideoResponse": {
                "raiMediaFilteredCount": 1,
                "raiMediaFilteredReasons": ["Unsafe content detected"]
            }}
        }))
        .unwrap();

        assert_eq!(
            operation_status(operation),
            GenerationStatus::Failed("content filtered: Unsafe content detected".into())
        );
    }

    #[test]
    fn test_operation_error_is_failure() {
        let operation: Operation = serde_json::from_value(json!({
            "name": "op",
            "done": true,
            "error": {"code": 3, "message": "invalid image"}
        }))
        .unwrap();
        assert_eq!(
            operation_status(operation),
            GenerationStatus::Failed("invalid image".into())
        );
    }
}
