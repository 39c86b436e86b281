//! Job pipeline for changelog videos.
//!
//! This crate provides:
//! - The stage invoker: bounded polling of asynchronous provider operations
//! - The pipeline orchestrator driving a job through its stages
//! - Structured per-job logging and pipeline metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod poller;
pub mod stage;


pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use pipeline::Pipeline;
pub use poller::{invoke_stage, PollOutcome, PollPolicy};
pub use stage::Stage;
