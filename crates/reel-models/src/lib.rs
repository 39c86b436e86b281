//! Shared data models for the ChangeReel backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, their identifiers and lifecycle transitions
//! - Video generation requests (aspect ratio, resolution)
//! - Artifact reference helpers for credential handling
//! - Internal network address checks

pub mod artifact;
pub mod error;
pub mod job;
pub mod job_status;
pub mod net;
pub mod request;

// Re-export common types
pub use artifact::{strip_credentials, with_query_credential, CREDENTIAL_PARAMS};
pub use error::TransitionError;
pub use job::{Job, JobId, JobTransition};
pub use job_status::JobStatus;
pub use request::{AspectRatio, Resolution, VideoRequest, MAX_SOURCE_URL_LENGTH};
