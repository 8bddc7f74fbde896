//! Shared service plumbing
//!
//! - logging: tracing subscriber setup (stderr console, optional rolling file)
//! - config: layered figment configuration loading
//! - shutdown: SIGINT/SIGTERM handling

pub mod config;
mod error;
pub mod logging;
pub mod shutdown;

pub use config::load_config;
pub use error::{Error, Result};
pub use logging::LogConfig;
