//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A threshold is outside [0, 1] or the band edges are inverted.
    #[error("invalid threshold configuration: {detail}")]
    InvalidThresholds { detail: String },

    /// An upstream URL is empty or not http(s).
    #[error("invalid upstream URL '{value}' in {name}")]
    InvalidUrl { name: &'static str, value: String },

    /// The request budget must be positive.
    #[error("invalid timeout '{value}': must be greater than zero")]
    InvalidTimeout { value: u64 },
}
