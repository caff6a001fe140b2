//! UDP transport with TCP fallback for truncated responses.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfig, ResolveHosts, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::proto::rr::{Name, RData, Record};
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{ResolveError, ResolveErrorKind, Resolver, TokioResolver};
use parking_lot::Mutex;
use tracing::debug;

use super::{AnswerRecord, DnsQuery, DnsResponse, DnsTransport, SrvRecord};
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};

/// Sends each query to a single server through a hickory resolver.
///
/// One resolver is built per server address and reused. It has no cache,
/// never consults the hosts file and makes one attempt per exchange. When TCP
/// fallback is enabled the server is also registered over TCP, and hickory
/// repeats a truncated UDP exchange there.
#[derive(Debug)]
pub struct UdpTransport {
    timeout: Duration,
    tcp_fallback: bool,
    resolvers: Mutex<HashMap<SocketAddr, TokioResolver>>,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::from_config(&DiscoveryConfig::default())
    }
}

impl UdpTransport {
    /// Create a transport with the given per-exchange timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            tcp_fallback: true,
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    /// Create a transport from the timeout settings of a discovery config.
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.timeout).tcp_fallback(config.tcp_fallback)
    }

    /// Set whether truncated responses are retried over TCP.
    pub fn tcp_fallback(mut self, enabled: bool) -> Self {
        self.tcp_fallback = enabled;
        self
    }

    fn resolver_for(&self, server: SocketAddr) -> TokioResolver {
        self.resolvers
            .lock()
            .entry(server)
            .or_insert_with(|| {
                debug!(%server, tcp_fallback = self.tcp_fallback, "Building DNS client");
                let (config, opts) = build_resolver_config(server, self.timeout, self.tcp_fallback);
                Resolver::builder_with_config(config, TokioConnectionProvider::default())
                    .with_options(opts)
                    .build()
            })
            .clone()
    }
}

impl DnsTransport for UdpTransport {
    async fn exchange(&self, server: SocketAddr, query: &DnsQuery) -> Result<DnsResponse> {
        let name = Name::from_ascii(&query.name).map_err(|e| {
            DiscoveryError::transport(server, format!("invalid query name {}: {e}", query.name))
        })?;

        let resolver = self.resolver_for(server);
        match resolver.lookup(name, query.record_type).await {
            Ok(lookup) => Ok(DnsResponse::success(decode_records(lookup.records()))),
            Err(e) => response_from_error(server, e),
        }
    }
}

/// Hickory configuration talking to `server` only.
fn build_resolver_config(
    server: SocketAddr,
    timeout: Duration,
    tcp_fallback: bool,
) -> (ResolverConfig, ResolverOpts) {
    let mut config = ResolverConfig::new();
    config.add_name_server(NameServerConfig::new(server, Protocol::Udp));
    if tcp_fallback {
        config.add_name_server(NameServerConfig::new(server, Protocol::Tcp));
    }

    let mut opts = ResolverOpts::default();
    opts.cache_size = 0;
    opts.use_hosts_file = ResolveHosts::Never;
    opts.attempts = 0;
    opts.timeout = timeout;

    (config, opts)
}

/// Turn a failed lookup back into a response when the server did answer.
///
/// Hickory reports empty and negative answers as errors. Those carry the
/// server's response code and are not transport failures.
fn response_from_error(server: SocketAddr, error: ResolveError) -> Result<DnsResponse> {
    if let ResolveErrorKind::Proto(proto) = error.kind() {
        if let ProtoErrorKind::NoRecordsFound { response_code, .. } = proto.kind() {
            return Ok(DnsResponse::with_code(*response_code));
        }
    }
    Err(DiscoveryError::transport(server, error))
}

/// Convert answer records into the transport-neutral form, keeping order.
pub(crate) fn decode_records(records: &[Record]) -> Vec<AnswerRecord> {
    records
        .iter()
        .map(|record| match record.data() {
            RData::SRV(srv) => AnswerRecord::Srv(SrvRecord {
                target: srv.target().to_ascii(),
                port: srv.port(),
                priority: srv.priority(),
                weight: srv.weight(),
            }),
            RData::A(a) => AnswerRecord::A(a.0),
            _ => AnswerRecord::Other(record.record_type()),
        })
        .collect()
}
