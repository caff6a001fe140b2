//! Resolved service endpoints.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// A resolved endpoint of a service.
///
/// Built only from an SRV answer whose target resolved to an IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceInstance {
    ip: String,
    port: String,
    addr: SocketAddrV4,
}

impl ServiceInstance {
    pub(crate) fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self {
            ip: ip.to_string(),
            port: port.to_string(),
            addr: SocketAddrV4::new(ip, port),
        }
    }

    /// Dotted-decimal IPv4 address.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Decimal port number.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The endpoint as a socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(self.addr)
    }

    /// Split into `(ip, port)`.
    pub fn into_parts(self) -> (String, String) {
        (self.ip, self.port)
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
