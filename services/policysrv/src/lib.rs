//! Signal policy service
//!
//! Loads a rule document, optionally seeds the signal state, and runs the
//! dispatcher over the selected transport until `quit`, end of input, or
//! SIGINT/SIGTERM.

pub mod app;
pub mod cli;
pub mod config;

pub use cli::Args;
pub use config::PolicyConfig;
