//! Error types for service discovery.

use hickory_resolver::proto::op::ResponseCode;

/// Errors produced while building a resolver or discovering services.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The discovery server address is malformed.
    #[error("invalid discovery server address: {0}")]
    Configuration(String),

    /// The discovery server hostname could not be resolved at startup.
    #[error("no service discovery host could be resolved for {host}: {reason}")]
    Resolution {
        /// The hostname that failed to resolve.
        host: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// Network I/O failed while exchanging a query with the DNS server.
    #[error("error during connection to DNS server {server}: {reason}")]
    Transport {
        /// The pinned DNS server address.
        server: String,
        /// The underlying failure.
        reason: String,
    },

    /// The DNS server answered with a non-success response code.
    #[error("DNS query for {name} did not succeed: {code}")]
    QueryFailed {
        /// The queried name.
        name: String,
        /// The response code returned by the server.
        code: ResponseCode,
    },

    /// The DNS server answered successfully but without an A record.
    #[error("no A entry in DNS response for {name}")]
    NoRecord {
        /// The queried name.
        name: String,
    },

    /// The SRV query succeeded but yielded no usable instance.
    #[error("no SRV entry in DNS response for service {service}")]
    NoInstance {
        /// The service that was looked up.
        service: String,
    },

    /// A configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DiscoveryError {
    /// Create a new Transport error.
    pub fn transport(server: impl ToString, reason: impl ToString) -> Self {
        Self::Transport {
            server: server.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the network rather than from a DNS answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<toml::de::Error> for DiscoveryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A specialized Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
