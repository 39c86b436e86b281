//! Result access gateway.
//!
//! Completed jobs store the provider's artifact URL without credentials.
//! The gateway re-checks that URL against the origin allowlist on every
//! access, attaches the server-held key, and hands the upstream response back
//! for streaming. Neither the key nor the upstream URL reaches the client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use reel_models::{with_query_credential, JobId};
use reel_registry::{JobRegistry, RegistryError};

use crate::metrics;
use crate::security::OriginAllowlist;

/// Query parameter carrying the provider key.
const CREDENTIAL_PARAM: &str = "key";

const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Job not found")]
    JobNotFound,

    #[error("Job has no result")]
    NoResult,

    /// Stored reference points outside the allowlist.
    #[error("Untrusted result origin: {0}")]
    UntrustedOrigin(String),

    #[error("Upstream fetch failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// An open upstream artifact, ready to stream.
pub struct ResultDownload {
    pub content_type: String,
    pub content_length: Option<u64>,
    pub filename: String,
    pub response: reqwest::Response,
}

/// Credential-shielding proxy for job results.
pub struct ResultGateway {
    registry: Arc<dyn JobRegistry>,
    allowlist: OriginAllowlist,
    credential: Option<String>,
    client: Client,
}

impl ResultGateway {
    /// `read_timeout` bounds each read from upstream, not the whole transfer,
    /// so long downloads to slow clients are not cut off.
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        allowlist: OriginAllowlist,
        credential: Option<String>,
        read_timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(read_timeout)
            .build()
            .map_err(|e| GatewayError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            registry,
            allowlist,
            credential,
            client,
        })
    }

    /// Resolve a job's result and open the upstream artifact.
    pub async fn open(&self, job_id: &JobId) -> GatewayResult<ResultDownload> {
        let job = self
            .registry
            .get(job_id)
            .await?
            .ok_or(GatewayError::JobNotFound)?;
        let reference = job.result_ref.ok_or(GatewayError::NoResult)?;

        let url = self.trusted_url(job_id, &reference)?;
        let url = match &self.credential {
            Some(key) => with_query_credential(&url, CREDENTIAL_PARAM, key),
            None => url,
        };

        // reqwest errors embed the request URL, which now carries the key
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!(job_id = %job_id, status = status.as_u16(), "Result upstream returned error");
            return Err(GatewayError::Upstream(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        info!(job_id = %job_id, content_type = %content_type, "Serving job result");
        metrics::record_result_served();

        Ok(ResultDownload {
            content_type,
            content_length: response.content_length(),
            filename: download_filename(job_id),
            response,
        })
    }

    fn trusted_url(&self, job_id: &JobId, reference: &str) -> GatewayResult<Url> {
        let rejected = |origin: String| {
            error!(
                target: "security",
                job_id = %job_id,
                origin = %origin,
                "Refusing to fetch result from untrusted origin"
            );
            metrics::record_security_rejection("result_origin");
            GatewayError::UntrustedOrigin(origin)
        };

        let url = Url::parse(reference).map_err(|_| rejected("<unparseable>".to_string()))?;
        if !self.allowlist.is_allowed(&url) {
            return Err(rejected(url.origin().ascii_serialization()));
        }
        Ok(url)
    }
}

/// Attachment filename offered to the client.
pub fn download_filename(job_id: &JobId) -> String {
    format!("changelog-video-{}.mp4", job_id)
}

#[cfg(test)]
mod tests {
    use reel_models::{JobTransition, VideoRequest};
    use reel_registry::InMemoryJobRegistry;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn completed_job(registry: &Arc<dyn JobRegistry>, result_ref: &str) -> JobId {
        let job = registry
            .create(VideoRequest::new("https://example.com/CHANGELOG.md"))
            .await
            .unwrap();
        registry.update(&job.id, JobTransition::Start).await.unwrap();
        registry
            .update(
                &job.id,
                JobTransition::Complete {
                    result_ref: result_ref.to_string(),
                },
            )
            .await
            .unwrap();
        job.id
    }

    fn gateway(registry: &Arc<dyn JobRegistry>, origins: &[&str]) -> ResultGateway {
        ResultGateway::new(
            Arc::clone(registry),
            OriginAllowlist::from_entries(origins),
            Some("SECRET".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
        let err = gateway(&registry, &["https://storage.googleapis.com"])
            .open(&JobId::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::JobNotFound));
    }

    #[tokio::test]
    async fn test_unfinished_job_has_no_result() {
        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
        let job = registry
            .create(VideoRequest::new("https://example.com/CHANGELOG.md"))
            .await
            .unwrap();
        let err = gateway(&registry, &["https://storage.googleapis.com"])
            .open(&job.id)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::NoResult));
    }

    #[tokio::test]
    async fn test_untrusted_origin_is_rejected_before_fetch() {
        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
        let id = completed_job(&registry, "https://evil.com/storage.googleapis.com/x.mp4").await;

        let err = gateway(&registry, &["https://storage.googleapis.com"])
            .open(&id)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::UntrustedOrigin(ref o) if o == "https://evil.com"));
    }

    #[tokio::test]
    async fn test_allowed_origin_gets_credential_and_streams() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/v1.mp4"))
            .and(query_param("alt", "media"))
            .and(query_param("key", "SECRET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(b"fake-mp4".to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
        let id = completed_job(&registry, &format!("{}/files/v1.mp4?alt=media", server.uri())).await;

        let download = gateway(&registry, &["http://127.0.0.1"]).open(&id).await.unwrap();
        assert_eq!(download.content_type, "video/mp4");
        assert_eq!(download.filename, format!("changelog-video-{}.mp4", id));
        assert_eq!(download.response.bytes().await.unwrap().as_ref(), b"fake-mp4");
    }

    #[tokio::test]
    async fn test_upstream_error_hides_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
        let id = completed_job(&registry, &format!("{}/files/v1.mp4", server.uri())).await;

        let err = gateway(&registry, &["http://127.0.0.1"])
            .open(&id)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::Upstream(ref m) if m == "HTTP 403"));
        assert!(!err.to_string().contains("SECRET"));
    }

    #[tokio::test]
    async fn test_slow_download_outlasting_read_timeout_completes() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        // Each byte arrives well within the read timeout, the whole body does not
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: video/mp4\r\ncontent-length: 6\r\nconnection: close\r\n\r\n",
                )
                .await
                .unwrap();
            for byte in b"abcdef" {
                tokio::time::sleep(Duration::from_millis(250)).await;
                socket.write_all(&[*byte]).await.unwrap();
            }
        });

        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
        let id = completed_job(&registry, &format!("http://{}/v.mp4", addr)).await;
        let gateway = ResultGateway::new(
            Arc::clone(&registry),
            OriginAllowlist::from_entries(&["http://127.0.0.1"]),
            None,
            Duration::from_secs(1),
        )
        .unwrap();

        let download = gateway.open(&id).await.unwrap();
        assert_eq!(download.content_length, Some(6));
        assert_eq!(download.response.bytes().await.unwrap().as_ref(), b"abcdef");
    }
}
