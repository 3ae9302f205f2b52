use thiserror::Error;

/// Top-level error type for linkhop.
#[derive(Error, Debug)]
pub enum LinkhopError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for LinkhopError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
