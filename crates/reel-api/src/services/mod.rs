//! Business logic services.

pub mod gateway;
pub mod retention;

pub use gateway::{GatewayError, GatewayResult, ResultDownload, ResultGateway};
pub use retention::RetentionSweeper;
