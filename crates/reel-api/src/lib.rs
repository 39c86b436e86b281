//! Axum HTTP API server.
//!
//! This crate provides:
//! - The job lifecycle endpoints (create, status, result)
//! - The result access gateway with its origin allowlist
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{GatewayError, ResultGateway, RetentionSweeper};
pub use state::AppState;
