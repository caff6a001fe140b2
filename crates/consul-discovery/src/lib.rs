//! Service discovery through the Consul DNS interface.
//!
//! A service name such as `api` is turned into concrete endpoints in two
//! stages:
//!
//! 1. An SRV query for `api.service.consul.` returns target hostnames and
//!    ports.
//! 2. Each target hostname is resolved with an A query. Successful answers
//!    are cached for the lifetime of the resolver, so a node that hosts many
//!    services is only looked up once.
//!
//! # Example
//!
//! ```ignore
//! use consul_discovery::{DiscoveryConfig, Resolver};
//! use std::time::Duration;
//!
//! let config = DiscoveryConfig::new("consul.internal:8600")
//!     .search_suffix(".service.dc1.consul")
//!     .timeout(Duration::from_secs(2));
//!
//! let resolver = Resolver::with_config(config).await?;
//!
//! // One endpoint
//! let (ip, port) = resolver.discover_service("api").await?;
//!
//! // Every endpoint, in the order the server returned them
//! let instances = resolver.discover_all_service_instances("api").await?;
//! ```
//!
//! # Failure model
//!
//! Transport failures and non-success response codes on the SRV query fail
//! the whole call. A target that cannot be resolved to an address is dropped
//! from the result instead; the number of dropped targets is reported by
//! [`Resolver::stats`].
//!
//! # Custom transports
//!
//! Queries go through the [`DnsTransport`] trait. [`UdpTransport`] is used by
//! default; any other implementation can be supplied with
//! [`Resolver::with_transport`].

mod cache;
mod config;
mod error;
mod instance;
mod resolver;
mod stats;
pub mod transport;

pub use config::{DEFAULT_SEARCH_SUFFIX, DEFAULT_SERVER, DiscoveryConfig};
pub use error::{DiscoveryError, Result};
pub use instance::ServiceInstance;
pub use resolver::Resolver;
pub use stats::ResolverStats;
pub use transport::{AnswerRecord, DnsQuery, DnsResponse, DnsTransport, SrvRecord, UdpTransport};
