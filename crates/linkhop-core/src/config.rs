//! Configuration management for linkhop services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`LINKHOP__` prefix, `__` section separator)
//! 2. Config file (`linkhop.toml`, or any prefix passed on the command line)
//! 3. Defaults declared on each section type

use serde::de::DeserializeOwned;

use crate::error::LinkhopError;

/// Default config file prefix (`linkhop.toml`, `linkhop.yaml`, ...).
pub const DEFAULT_FILE_PREFIX: &str = "linkhop";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LINKHOP";

/// Build the layered configuration from an optional file and the environment.
pub fn load_layered(file_prefix: &str) -> Result<config::Config, LinkhopError> {
    load_layered_with_env(file_prefix, ENV_PREFIX)
}

/// Same as [`load_layered`] with an explicit environment prefix.
pub fn load_layered_with_env(
    file_prefix: &str,
    env_prefix: &str,
) -> Result<config::Config, LinkhopError> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(cfg)
}

/// Deserialize one section, falling back to its defaults when absent.
///
/// A present but malformed section is an error.
pub fn load_section<T>(cfg: &config::Config, section: &str) -> Result<T, LinkhopError>
where
    T: DeserializeOwned + Default,
{
    match cfg.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section not found, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(LinkhopError::Config(format!("[{section}]: {e}"))),
    }
}
