//! Application state.

use std::sync::Arc;

use tracing::warn;

use reel_providers::{ProviderConfig, Providers};
use reel_registry::{InMemoryJobRegistry, JobRegistry};
use reel_worker::{Pipeline, WorkerConfig};

use crate::config::ApiConfig;
use crate::security::OriginAllowlist;
use crate::services::ResultGateway;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<dyn JobRegistry>,
    pub pipeline: Arc<Pipeline>,
    pub gateway: Arc<ResultGateway>,
    /// Whether every provider credential was present at startup.
    pub providers_configured: bool,
}

impl AppState {
    /// Create application state backed by the HTTP providers.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let provider_config = ProviderConfig::from_env();
        if !provider_config.is_configured() {
            warn!(
                "Provider credentials missing; jobs will fail until \
                 GEMINI_API_KEY and REPLICATE_API_TOKEN are set"
            );
        }
        let providers = Providers::from_config(&provider_config)?;
        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());

        Self::from_parts(
            config,
            registry,
            providers,
            WorkerConfig::from_env(),
            &provider_config,
        )
    }

    /// Assemble state from explicit collaborators.
    pub fn from_parts(
        config: ApiConfig,
        registry: Arc<dyn JobRegistry>,
        providers: Providers,
        worker_config: WorkerConfig,
        provider_config: &ProviderConfig,
    ) -> anyhow::Result<Self> {
        let allowlist = OriginAllowlist::from_entries(&config.result_allowed_origins);
        if allowlist.is_empty() {
            anyhow::bail!("RESULT_ALLOWED_ORIGINS contains no valid origin");
        }

        let gateway = ResultGateway::new(
            Arc::clone(&registry),
            allowlist,
            provider_config.gemini_api_key.clone(),
            provider_config.request_timeout,
        )?;
        let pipeline = Pipeline::new(Arc::clone(&registry), providers, worker_config);

        Ok(Self {
            providers_configured: provider_config.is_configured(),
            config,
            registry,
            pipeline: Arc::new(pipeline),
            gateway: Arc::new(gateway),
        })
    }
}
