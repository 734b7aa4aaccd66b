/// Screener configuration: TOML file plus environment overrides

pub mod strategy;

pub use strategy::*;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Exchange credentials missing: {0}")]
    MissingCredentials(String),

    #[error("Exchange '{0}' is not supported (expected binance or mexc)")]
    UnsupportedExchange(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
