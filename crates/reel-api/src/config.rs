//! API configuration.

use std::time::Duration;

/// Result origins trusted when no `RESULT_ALLOWED_ORIGINS` is given.
pub const DEFAULT_RESULT_ORIGINS: &[&str] = &[
    "https://generativelanguage.googleapis.com",
    "https://storage.googleapis.com",
];

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Job creation rate limit per client IP (requests per second)
    pub rate_limit_rps: u32,
    /// Rate limit burst
    pub rate_limit_burst: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Origins (`scheme://host`) the result gateway may fetch from
    pub result_allowed_origins: Vec<String>,
    /// Terminal jobs older than this are pruned; `None` keeps them forever
    pub job_retention: Option<Duration>,
    /// Expose Prometheus metrics at `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 2,
            rate_limit_burst: 5,
            max_body_size: 64 * 1024,
            environment: "development".to_string(),
            result_allowed_origins: DEFAULT_RESULT_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            job_retention: None,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            rate_limit_burst: std::env::var("RATE_LIMIT_BURST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_burst),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            result_allowed_origins: std::env::var("RESULT_ALLOWED_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.result_allowed_origins),
            job_retention: std::env::var("JOB_RETENTION_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.result_allowed_origins.len(), 2);
        assert!(config.job_retention.is_none());
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(
            split_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
