//! Discovery configuration types.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DiscoveryError, Result};

/// Default address of a local Consul agent's DNS interface.
pub const DEFAULT_SERVER: &str = "127.0.0.1:8600";

/// Default suffix appended to service names.
pub const DEFAULT_SEARCH_SUFFIX: &str = ".service.consul";

/// Configuration for a discovery [`Resolver`](crate::Resolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Discovery DNS server in `host:port` form. The host may be a hostname,
    /// which is resolved once when the resolver is built.
    pub server: String,

    /// Suffix appended to every service name to form the queried name.
    pub search_suffix: String,

    /// Timeout for a single DNS exchange.
    pub timeout: Duration,

    /// Retry over TCP when a UDP response comes back truncated.
    pub tcp_fallback: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            search_suffix: DEFAULT_SEARCH_SUFFIX.to_string(),
            timeout: Duration::from_secs(5),
            tcp_fallback: true,
        }
    }
}

/// On-disk shape of the configuration. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    server: Option<String>,
    search_suffix: Option<String>,
    timeout_ms: Option<u64>,
    tcp_fallback: Option<bool>,
}

impl DiscoveryConfig {
    /// Create a configuration for the given discovery server.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Default::default()
        }
    }

    /// Set the search suffix.
    pub fn search_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.search_suffix = suffix.into();
        self
    }

    /// Set the timeout per exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether truncated UDP responses are retried over TCP.
    pub fn tcp_fallback(mut self, enabled: bool) -> Self {
        self.tcp_fallback = enabled;
        self
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    ///
    /// ```toml
    /// server = "consul.internal:8600"
    /// search_suffix = ".service.dc1.consul"
    /// timeout_ms = 2000
    /// tcp_fallback = false
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        let defaults = Self::default();

        if file.timeout_ms == Some(0) {
            return Err(DiscoveryError::Config(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            server: file.server.unwrap_or(defaults.server),
            search_suffix: file.search_suffix.unwrap_or(defaults.search_suffix),
            timeout: file
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            tcp_fallback: file.tcp_fallback.unwrap_or(defaults.tcp_fallback),
        })
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DiscoveryError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }
}
