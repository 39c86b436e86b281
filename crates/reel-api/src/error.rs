//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use reel_registry::RegistryError;

use crate::services::GatewayError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl ApiError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) | ApiError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation_error",
            ApiError::Internal(_) | ApiError::Registry(_) => "internal_error",
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::JobNotFound | GatewayError::NoResult => {
                ApiError::not_found("Result not found")
            }
            GatewayError::UntrustedOrigin(_) => {
                ApiError::forbidden("Result origin is not allowed")
            }
            GatewayError::Upstream(msg) => ApiError::internal(format!("Result fetch failed: {}", msg)),
            GatewayError::Registry(e) => ApiError::Registry(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Registry(_) => {
                error!(error = %self, "Request failed with internal error");
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            detail,
            code: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::validation("bad url").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(GatewayError::UntrustedOrigin("https://evil.com".into())).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(GatewayError::Upstream("HTTP 502".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_forbidden_detail_does_not_echo_origin() {
        let err = ApiError::from(GatewayError::UntrustedOrigin("https://evil.com".into()));
        assert!(!err.to_string().contains("evil.com"));
    }
}
