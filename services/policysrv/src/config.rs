//! Service configuration
//!
//! ```yaml
//! log:
//!   level: info
//!   json: false
//!   dir: /var/log/policysrv
//! transport:
//!   selector: stdio
//! ```

use std::path::Path;

use common::LogConfig;
use serde::{Deserialize, Serialize};
use signal_policy::transport::DEFAULT_TRANSPORT;

use crate::cli::Args;

pub const SERVICE_NAME: &str = "policysrv";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub log: LogConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport selector, see `TransportKind`
    pub selector: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            selector: DEFAULT_TRANSPORT.to_string(),
        }
    }
}

impl PolicyConfig {
    /// Defaults, then config file, then `POLICYSRV_*` environment
    pub fn load(config_file: Option<&Path>) -> common::Result<Self> {
        let mut config: Self = common::load_config(SERVICE_NAME, config_file)?;
        config.log.service_name = SERVICE_NAME.to_string();
        Ok(config)
    }

    /// Load and apply command-line overrides
    pub fn from_args(args: &Args) -> common::Result<Self> {
        let mut config = Self::load(args.config.as_deref())?;
        config.apply_overrides(args);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(level) = &args.log_level {
            self.log.level = level.clone();
        }
        if let Some(selector) = &args.transport {
            self.transport.selector = selector.clone();
        }
    }
}
