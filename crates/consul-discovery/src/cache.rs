//! Target hostname to address cache.
//!
//! Entries are never evicted, expired or refreshed. The first address stored
//! for a hostname is the one every later lookup sees.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::Ipv4Addr;

use parking_lot::RwLock;
use tracing::debug;

/// Cache of resolved SRV target addresses, keyed by bare hostname.
#[derive(Debug, Default)]
pub(crate) struct TargetCache {
    entries: RwLock<HashMap<String, Ipv4Addr>>,
}

impl TargetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached address for `hostname`.
    pub fn get(&self, hostname: &str) -> Option<Ipv4Addr> {
        self.entries.read().get(hostname).copied()
    }

    /// Store `addr` for `hostname` unless an address is already present.
    ///
    /// Returns the address that ends up cached.
    pub fn insert(&self, hostname: &str, addr: Ipv4Addr) -> Ipv4Addr {
        match self.entries.write().entry(hostname.to_string()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                debug!(hostname, %addr, "Cached target address");
                *entry.insert(addr)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}
