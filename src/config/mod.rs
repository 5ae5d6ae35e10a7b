//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `PINPOINT_*` environment
//! variables. Threshold knobs feed the ambiguity gate and the relevance
//! scorer; they are validated once at startup, never at call sites.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use crate::ambiguity::{AmbiguityThresholds, DEFAULT_CLARIFY_THRESHOLD, DEFAULT_STRICT_EMPTY_THRESHOLD};
use crate::budget::DEFAULT_REQUEST_BUDGET;
use crate::scoring::DEFAULT_MIN_OVERLAP;
use crate::store::DEFAULT_MEMO_CAPACITY;

/// Default upstream search endpoint used when `PINPOINT_UPSTREAM_URL` is not set.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:9200/catalog/search";

/// Default multi-merchant invoke endpoint.
pub const DEFAULT_INVOKE_URL: &str = "http://localhost:9200/catalog/invoke";

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `PINPOINT_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Primary catalog search endpoint.
    pub upstream_url: String,

    /// Secondary multi-merchant invoke endpoint.
    pub invoke_url: String,

    /// Per-request time budget in milliseconds. Default: `4000`.
    pub timeout_ms: u64,

    /// Retries per live-search stage (attempts = retries + 1). Default: `1`.
    pub upstream_retries: u32,

    /// Lower edge of the ambiguity clarify band. Default: `0.45`.
    pub clarify_threshold: f32,

    /// Upper edge of the clarify band; above it the gate returns a strict
    /// empty. Default: `0.8`.
    pub strict_empty_threshold: f32,

    /// Whether mid-band ambiguity asks a clarifying question instead of
    /// degrading to empty. Default: `true`.
    pub medium_clarify_enabled: bool,

    /// Minimum token overlap for a candidate to count as relevant.
    /// Default: `0.34`.
    pub min_overlap: f32,

    /// Run the resolver cascade before the live proxy on the search route.
    /// Default: `false`.
    pub resolver_first_search: bool,

    /// Max entries in the cross-merchant memo cache. Default: `256`.
    pub memo_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            invoke_url: DEFAULT_INVOKE_URL.to_string(),
            timeout_ms: DEFAULT_REQUEST_BUDGET.as_millis() as u64,
            upstream_retries: 1,
            clarify_threshold: DEFAULT_CLARIFY_THRESHOLD,
            strict_empty_threshold: DEFAULT_STRICT_EMPTY_THRESHOLD,
            medium_clarify_enabled: true,
            min_overlap: DEFAULT_MIN_OVERLAP,
            resolver_first_search: false,
            memo_capacity: DEFAULT_MEMO_CAPACITY,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "PINPOINT_PORT";
    const ENV_BIND_ADDR: &'static str = "PINPOINT_BIND_ADDR";
    const ENV_UPSTREAM_URL: &'static str = "PINPOINT_UPSTREAM_URL";
    const ENV_INVOKE_URL: &'static str = "PINPOINT_INVOKE_URL";
    const ENV_TIMEOUT_MS: &'static str = "PINPOINT_TIMEOUT_MS";
    const ENV_UPSTREAM_RETRIES: &'static str = "PINPOINT_UPSTREAM_RETRIES";
    const ENV_CLARIFY_THRESHOLD: &'static str = "PINPOINT_CLARIFY_THRESHOLD";
    const ENV_STRICT_EMPTY_THRESHOLD: &'static str = "PINPOINT_STRICT_EMPTY_THRESHOLD";
    const ENV_MEDIUM_CLARIFY: &'static str = "PINPOINT_MEDIUM_CLARIFY";
    const ENV_MIN_OVERLAP: &'static str = "PINPOINT_MIN_OVERLAP";
    const ENV_RESOLVER_FIRST_SEARCH: &'static str = "PINPOINT_RESOLVER_FIRST_SEARCH";
    const ENV_MEMO_CAPACITY: &'static str = "PINPOINT_MEMO_CAPACITY";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let upstream_url = Self::parse_string_from_env(Self::ENV_UPSTREAM_URL, defaults.upstream_url);
        let invoke_url = Self::parse_string_from_env(Self::ENV_INVOKE_URL, defaults.invoke_url);
        let timeout_ms = Self::parse_u64_from_env(Self::ENV_TIMEOUT_MS, defaults.timeout_ms);
        let upstream_retries =
            Self::parse_u32_from_env(Self::ENV_UPSTREAM_RETRIES, defaults.upstream_retries);
        let clarify_threshold =
            Self::parse_f32_from_env(Self::ENV_CLARIFY_THRESHOLD, defaults.clarify_threshold);
        let strict_empty_threshold = Self::parse_f32_from_env(
            Self::ENV_STRICT_EMPTY_THRESHOLD,
            defaults.strict_empty_threshold,
        );
        let medium_clarify_enabled =
            Self::parse_bool_from_env(Self::ENV_MEDIUM_CLARIFY, defaults.medium_clarify_enabled);
        let min_overlap = Self::parse_f32_from_env(Self::ENV_MIN_OVERLAP, defaults.min_overlap);
        let resolver_first_search = Self::parse_bool_from_env(
            Self::ENV_RESOLVER_FIRST_SEARCH,
            defaults.resolver_first_search,
        );
        let memo_capacity =
            Self::parse_u64_from_env(Self::ENV_MEMO_CAPACITY, defaults.memo_capacity);

        Ok(Self {
            port,
            bind_addr,
            upstream_url,
            invoke_url,
            timeout_ms,
            upstream_retries,
            clarify_threshold,
            strict_empty_threshold,
            medium_clarify_enabled,
            min_overlap,
            resolver_first_search,
            memo_capacity,
        })
    }

    /// Validates URLs and band invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            (Self::ENV_UPSTREAM_URL, &self.upstream_url),
            (Self::ENV_INVOKE_URL, &self.invoke_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(ConfigError::InvalidUrl {
                    name,
                    value: value.clone(),
                });
            }
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                value: self.timeout_ms,
            });
        }

        for (label, value) in [
            ("clarify_threshold", self.clarify_threshold),
            ("strict_empty_threshold", self.strict_empty_threshold),
            ("min_overlap", self.min_overlap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThresholds {
                    detail: format!("{label} must be in [0, 1], got {value}"),
                });
            }
        }
        if self.clarify_threshold >= self.strict_empty_threshold {
            return Err(ConfigError::InvalidThresholds {
                detail: format!(
                    "clarify_threshold ({}) must sit below strict_empty_threshold ({})",
                    self.clarify_threshold, self.strict_empty_threshold
                ),
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// The per-request budget as a [`Duration`].
    pub fn request_budget(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Gate banding derived from the threshold knobs.
    pub fn ambiguity_thresholds(&self) -> AmbiguityThresholds {
        AmbiguityThresholds {
            clarify: self.clarify_threshold,
            strict_empty: self.strict_empty_threshold,
            medium_clarify_enabled: self.medium_clarify_enabled,
        }
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u32_from_env(var_name: &str, default: u32) -> u32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_f32_from_env(var_name: &str, default: f32) -> f32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        match env::var(var_name) {
            Ok(value) => matches!(value.trim(), "1" | "true" | "yes" | "on"),
            Err(_) => default,
        }
    }
}
