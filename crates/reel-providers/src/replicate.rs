//! Replicate predictions client for image generation.

use async_trait::async_trait;
use reel_models::AspectRatio;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::traits::ImageGenerator;
use crate::types::{GenerationHandle, GenerationStatus, Submission};

const REPLICATE: &str = "Replicate";

/// Replicate API client.
pub struct ReplicateClient {
    api_token: String,
    base_url: String,
    model: String,
    client: Client,
}

/// Prediction object as returned by create and get.
#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl ReplicateClient {
    /// Create a new Replicate client.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let api_token = config
            .replicate_api_token
            .clone()
            .ok_or_else(|| ProviderError::config("REPLICATE_API_TOKEN not set"))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: config.replicate_base_url.trim_end_matches('/').to_string(),
            model: config.replicate_image_model.clone(),
            client,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ProviderResult<Prediction> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| ProviderError::request(REPLICATE, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::api(REPLICATE, status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(REPLICATE, e.to_string()))
    }
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    async fn start(&self, prompt: &str, aspect_ratio: AspectRatio) -> ProviderResult<Submission> {
        let url = format!("{}/v1/models/{}/predictions", self.base_url, self.model);
        let body = json!({
            "input": {
                "prompt": prompt,
                "aspect_ratio": aspect_ratio.as_str(),
                "output_format": "png",
            }
        });

        let prediction = self.send(self.client.post(&url).json(&body)).await?;
        info!(prediction_id = %prediction.id, model = %self.model, "Started image generation");

        Ok(Submission {
            handle: GenerationHandle::new(prediction.id.clone()),
            status: prediction_status(prediction)?,
        })
    }

    async fn poll(&self, handle: &GenerationHandle) -> ProviderResult<GenerationStatus> {
        let url = format!("{}/v1/predictions/{}", self.base_url, handle.as_str());
        let prediction = self.send(self.client.get(&url)).await?;
        prediction_status(prediction)
    }
}

fn prediction_status(prediction: Prediction) -> ProviderResult<GenerationStatus> {
    match prediction.status.as_str() {
        "starting" | "processing" => Ok(GenerationStatus::Pending),
        "succeeded" => first_output_url(prediction.output.as_ref())
            .map(GenerationStatus::Succeeded)
            .ok_or_else(|| ProviderError::invalid_response(REPLICATE, "succeeded without output")),
        "failed" => Ok(GenerationStatus::Failed(
            prediction
                .error
                .map(|e| match e {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "prediction failed".to_string()),
        )),
        "canceled" => Ok(GenerationStatus::Failed("prediction was canceled".to_string())),
        other => Err(ProviderError::invalid_response(
            REPLICATE,
            format!("unknown prediction status '{}'", other),
        )),
    }
}

/// Output is either a single URL or a list of URLs depending on the model.
fn first_output_url(output: Option<&Value>) -> Option<String> {
    match output? {
        Value::String(url) => Some(url.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ReplicateClient {
        let config = ProviderConfig {
            replicate_api_token: Some("r8_test".into()),
            replicate_base_url: server.uri(),
            ..Default::default()
        };
        ReplicateClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_start_then_poll_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/models/black-forest-labs/flux-schnell/predictions"))
            .and(header("authorization", "Bearer r8_test"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p1", "status": "starting"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p1",
                "status": "succeeded",
                "output": ["https://replicate.delivery/p1/out-0.png"]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let submission = client.start("a calm desk", AspectRatio::Landscape).await.unwrap();
        assert_eq!(submission.handle.as_str(), "p1");
        assert_eq!(submission.status, GenerationStatus::Pending);

        let status = client.poll(&submission.handle).await.unwrap();
        assert_eq!(
            status,
            GenerationStatus::Succeeded("https://replicate.delivery/p1/out-0.png".into())
        );
    }

    #[test]
    fn test_failed_prediction_carries_reason() {
        let prediction = Prediction {
            id: "p".into(),
            status: "failed".into(),
            output: None,
            error: Some(json!("NSFW content detected")),
        };
        assert_eq!(
            prediction_status(prediction).unwrap(),
            GenerationStatus::Failed("NSFW content detected".into())
        );
    }

    #[test]
    fn test_single_string_output() {
        assert_eq!(
            first_output_url(Some(&json!("https://x/y.png"))),
            Some("https://x/y.png".to_string())
        );
        assert_eq!(first_output_url(Some(&json!({}))), None);
        assert_eq!(first_output_url(None), None);
    }
}
