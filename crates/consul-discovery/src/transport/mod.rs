//! DNS transport used by the resolver.
//!
//! The resolver never touches sockets itself. It hands a [`DnsQuery`] to a
//! [`DnsTransport`] together with the pinned server address and gets back a
//! [`DnsResponse`] whose answers are already decoded into [`AnswerRecord`]s.
//!
//! [`UdpTransport`] is the production implementation. Tests substitute their
//! own transport to script responses and count exchanges.

mod udp;

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

pub use hickory_resolver::proto::op::ResponseCode;
pub use hickory_resolver::proto::rr::RecordType;
pub use udp::UdpTransport;

use crate::error::Result;

/// A single-question DNS query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    /// Fully-qualified name, always ending in a dot.
    pub name: String,
    /// The record type asked for.
    pub record_type: RecordType,
}

impl DnsQuery {
    /// Create a query for `name`, appending the root dot if missing.
    pub fn new(name: &str, record_type: RecordType) -> Self {
        Self {
            name: fqdn(name),
            record_type,
        }
    }

    /// SRV query for `name`.
    pub fn srv(name: &str) -> Self {
        Self::new(name, RecordType::SRV)
    }

    /// A query for `name`.
    pub fn a(name: &str) -> Self {
        Self::new(name, RecordType::A)
    }
}

/// An SRV answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    /// Target hostname in wire form, with its trailing dot.
    pub target: String,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
}

/// An answer record, decoded once when the response is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerRecord {
    /// Service location record.
    Srv(SrvRecord),
    /// IPv4 address record.
    A(Ipv4Addr),
    /// Any other record type; ignored by the resolver.
    Other(RecordType),
}

/// A parsed DNS response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsResponse {
    pub response_code: ResponseCode,
    /// Answer section in the order the server returned it.
    pub answers: Vec<AnswerRecord>,
}

impl DnsResponse {
    /// A successful response carrying `answers`.
    pub fn success(answers: Vec<AnswerRecord>) -> Self {
        Self {
            response_code: ResponseCode::NoError,
            answers,
        }
    }

    /// An empty response with the given code.
    pub fn with_code(response_code: ResponseCode) -> Self {
        Self {
            response_code,
            answers: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.response_code == ResponseCode::NoError
    }
}

/// Sends a query to a DNS server and returns the parsed response.
///
/// Implementations own retransmission and timeouts. An `Err` means the
/// exchange itself failed; a server-side failure is reported through
/// [`DnsResponse::response_code`].
pub trait DnsTransport: Send + Sync {
    fn exchange(
        &self,
        server: SocketAddr,
        query: &DnsQuery,
    ) -> impl Future<Output = Result<DnsResponse>> + Send;
}

impl<T: DnsTransport> DnsTransport for Arc<T> {
    fn exchange(
        &self,
        server: SocketAddr,
        query: &DnsQuery,
    ) -> impl Future<Output = Result<DnsResponse>> + Send {
        self.as_ref().exchange(server, query)
    }
}

/// Canonical trailing-dot form of `name`.
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}
