//! Job registry.
//!
//! This crate provides:
//! - The [`JobRegistry`] capability (create / get / atomic update)
//! - An in-memory implementation for single-process deployments

pub mod error;
pub mod memory;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use memory::InMemoryJobRegistry;
pub use registry::JobRegistry;
