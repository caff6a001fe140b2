//! Service resolver over the Consul DNS interface.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::{debug, error, warn};

use crate::cache::TargetCache;
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::instance::ServiceInstance;
use crate::stats::{Counters, ResolverStats};
use crate::transport::{AnswerRecord, DnsQuery, DnsTransport, UdpTransport};

/// Resolves service names to endpoints with an SRV lookup followed by
/// cached A lookups of each SRV target.
///
/// The discovery server address is pinned when the resolver is built and
/// never re-resolved. Resolved target addresses are cached for the lifetime
/// of the resolver.
///
/// # Example
///
/// ```ignore
/// use consul_discovery::Resolver;
///
/// let resolver = Resolver::new("127.0.0.1:8600").await?;
///
/// let (ip, port) = resolver.discover_service("api").await?;
/// println!("api is at {ip}:{port}");
///
/// for instance in resolver.discover_all_service_instances("api").await? {
///     println!("{instance}");
/// }
/// ```
#[derive(Debug)]
pub struct Resolver<T = UdpTransport> {
    server: SocketAddr,
    search_suffix: String,
    transport: T,
    cache: TargetCache,
    counters: Counters,
}

impl Resolver<UdpTransport> {
    /// Create a resolver for the discovery server at `server` (`host:port`)
    /// with default settings.
    pub async fn new(server: &str) -> Result<Self> {
        Self::with_config(DiscoveryConfig::new(server)).await
    }

    /// Create a resolver that talks to the server over UDP.
    pub async fn with_config(config: DiscoveryConfig) -> Result<Self> {
        let transport = UdpTransport::from_config(&config);
        Self::with_transport(config, transport).await
    }
}

impl<T: DnsTransport> Resolver<T> {
    /// Create a resolver that sends its queries through `transport`.
    ///
    /// If the configured server host is not an IP literal it is looked up
    /// here and the first address returned is used from then on.
    pub async fn with_transport(config: DiscoveryConfig, transport: T) -> Result<Self> {
        let server = pin_server(&config.server).await?;
        debug!(%server, suffix = %config.search_suffix, "Created discovery resolver");

        Ok(Self {
            server,
            search_suffix: config.search_suffix,
            transport,
            cache: TargetCache::new(),
            counters: Counters::default(),
        })
    }

    /// The pinned discovery server address.
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn search_suffix(&self) -> &str {
        &self.search_suffix
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current counters.
    pub fn stats(&self) -> ResolverStats {
        self.counters.snapshot(self.cache.len())
    }

    /// Return the address and port of one instance of `service_name`.
    ///
    /// This is the first instance in SRV answer order; no selection policy is
    /// applied.
    pub async fn discover_service(&self, service_name: &str) -> Result<(String, String)> {
        let instances = self.discover_all_service_instances(service_name).await?;

        match instances.into_iter().next() {
            Some(instance) => Ok(instance.into_parts()),
            None => {
                error!(service = service_name, "Service lookup: no SRV entry in DNS response");
                Err(DiscoveryError::NoInstance {
                    service: service_name.to_string(),
                })
            }
        }
    }

    /// Return every resolvable instance of `service_name`, in SRV answer order.
    ///
    /// Errors are only returned when the SRV query itself fails. Targets whose
    /// address cannot be resolved are left out of the result and counted in
    /// [`ResolverStats::skipped_targets`].
    pub async fn discover_all_service_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<ServiceInstance>> {
        let query = DnsQuery::srv(&format!("{service_name}{}", self.search_suffix));

        Counters::bump(&self.counters.srv_queries);
        let response = self
            .transport
            .exchange(self.server, &query)
            .await
            .inspect_err(|e| {
                error!(
                    service = %query.name,
                    dns_server = %self.server,
                    error = %e,
                    "Error during connection to DNS server"
                );
            })?;

        if !response.is_success() {
            error!(
                service = %query.name,
                code = %response.response_code,
                "Service lookup: DNS query did not succeed"
            );
            return Err(DiscoveryError::QueryFailed {
                name: query.name,
                code: response.response_code,
            });
        }

        let mut instances = Vec::new();
        for answer in &response.answers {
            let AnswerRecord::Srv(srv) = answer else {
                continue;
            };

            let target = srv.target.strip_suffix('.').unwrap_or(&srv.target);
            match self.resolve_target(target).await {
                Ok(ip) => instances.push(ServiceInstance::new(ip, srv.port)),
                Err(e) => {
                    Counters::bump(&self.counters.skipped_targets);
                    debug!(
                        service = %query.name,
                        target_host = target,
                        error = %e,
                        "Skipping unresolved SRV target"
                    );
                }
            }
        }

        debug!(service = %query.name, count = instances.len(), "Discovered service instances");
        Ok(instances)
    }

    /// Resolve a bare target hostname to its IPv4 address, consulting the
    /// cache first. Only successful lookups are cached.
    async fn resolve_target(&self, target: &str) -> Result<Ipv4Addr> {
        if let Some(addr) = self.cache.get(target) {
            Counters::bump(&self.counters.cache_hits);
            return Ok(addr);
        }

        let query = DnsQuery::a(target);

        Counters::bump(&self.counters.target_queries);
        let response = self
            .transport
            .exchange(self.server, &query)
            .await
            .inspect_err(|e| {
                warn!(
                    fqdn = %query.name,
                    target_host = target,
                    dns_server = %self.server,
                    error = %e,
                    "Error during connection to DNS server"
                );
            })?;

        if !response.is_success() {
            warn!(
                fqdn = %query.name,
                target_host = target,
                code = %response.response_code,
                "Service lookup: target DNS query did not succeed"
            );
            return Err(DiscoveryError::QueryFailed {
                name: query.name,
                code: response.response_code,
            });
        }

        let addr = response.answers.iter().find_map(|answer| match answer {
            AnswerRecord::A(addr) => Some(*addr),
            _ => None,
        });

        match addr {
            Some(addr) => Ok(self.cache.insert(target, addr)),
            None => {
                warn!(fqdn = %query.name, target_host = target, "Service lookup: no A entry in DNS response");
                Err(DiscoveryError::NoRecord { name: query.name })
            }
        }
    }
}

/// Split `host:port`, accepting bracketed IPv6 hosts.
pub(crate) fn split_host_port(addr: &str) -> Result<(&str, u16)> {
    let malformed = |reason: &str| DiscoveryError::Configuration(format!("{addr}: {reason}"));

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        rest.split_once("]:")
            .ok_or_else(|| malformed("missing port after bracketed host"))?
    } else {
        let (host, port) = addr.rsplit_once(':').ok_or_else(|| malformed("missing port"))?;
        if host.contains(':') {
            return Err(malformed("too many colons"));
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(malformed("missing host"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| malformed("invalid port"))?;

    Ok((host, port))
}

/// Turn the configured server into a socket address, looking the host up
/// when it is not an IP literal.
async fn pin_server(addr: &str) -> Result<SocketAddr> {
    let (host, port) = split_host_port(addr)?;

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let resolution_error = |reason: String| {
        error!(host, %reason, "No service discovery host could be resolved");
        DiscoveryError::Resolution {
            host: host.to_string(),
            reason,
        }
    };

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| resolution_error(e.to_string()))?;

    let server = addrs
        .next()
        .ok_or_else(|| resolution_error("lookup returned no addresses".to_string()))?;
    debug!(host, %server, "Pinned discovery server address");
    Ok(server)
}
