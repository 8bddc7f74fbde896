//! Layered service configuration
//!
//! Priority (highest to lowest):
//! 1. Environment variables prefixed with `{SERVICE}_` (`__` separates
//!    nested keys, e.g. `POLICYSRV_LOG__LEVEL=debug`)
//! 2. The explicit config file, or `config/{service}.yaml` when present
//! 3. `T::default()`
//!
//! Command-line overrides are applied by the caller on the extracted value.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Default config file location for a service
pub fn default_config_path(service_name: &str) -> PathBuf {
    PathBuf::from("config").join(format!("{}.yaml", service_name))
}

/// Build the layered figment for `service_name`
///
/// An explicit `config_file` must exist; the default location is optional.
pub fn figment_for<T>(service_name: &str, config_file: Option<&Path>) -> Result<Figment>
where
    T: Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(file_provider(path)?);
        },
        None => {
            let path = default_config_path(service_name);
            if path.exists() {
                debug!("Using default config file {}", path.display());
                figment = figment.merge(Yaml::file(path));
            }
        },
    }

    let prefix = format!("{}_", service_name.to_uppercase());
    Ok(figment.merge(Env::prefixed(&prefix).split("__")))
}

/// Load configuration from defaults, file and environment
pub fn load_config<T>(service_name: &str, config_file: Option<&Path>) -> Result<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    figment_for::<T>(service_name, config_file)?
        .extract()
        .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))
}

fn file_provider(path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Config("Config file must have an extension".to_string()))?;

    let provider = match extension {
        "yaml" | "yml" => Figment::from(Yaml::file(path)),
        "toml" => Figment::from(Toml::file(path)),
        "json" => Figment::from(Json::file(path)),
        _ => {
            return Err(Error::Config(format!(
                "Unsupported config file format: {}",
                extension
            )))
        },
    };
    Ok(provider)
}
