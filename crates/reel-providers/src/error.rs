//! Provider error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Upper bound on upstream error bodies kept in messages.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Source content unreachable (network fault or non-2xx).
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("{provider} request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Explicit refusal, e.g. a content-policy block.
    #[error("{provider} rejected the request: {reason}")]
    Rejected {
        provider: &'static str,
        reason: String,
    },

    #[error("Invalid {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn request(provider: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Request {
            provider,
            message: err.to_string(),
        }
    }

    pub fn api(provider: &'static str, status: u16, body: &str) -> Self {
        Self::Api {
            provider,
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }

    pub fn rejected(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            provider,
            reason: reason.into(),
        }
    }

    pub fn invalid_response(provider: &'static str, msg: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this is an explicit policy rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ProviderError::Rejected { .. })
    }
}
