//! Request handlers.

pub mod health;
pub mod jobs;
pub mod results;

pub use health::*;
pub use jobs::*;
pub use results::*;
