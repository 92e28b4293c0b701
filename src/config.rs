// src/config.rs
//! Connection tuning.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which resolved addresses a connection may try, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressPreference {
    /// Resolver order
    #[default]
    Any,
    /// IPv6 first, then IPv4, each in resolver order
    PreferIpv6,
    /// IPv4 addresses only
    Ipv4Only,
    /// IPv6 addresses only
    Ipv6Only,
}

impl AddressPreference {
    /// Filters and orders `addrs` in place.
    pub fn apply(self, addrs: &mut Vec<SocketAddr>) {
        match self {
            Self::Any => {}
            Self::PreferIpv6 => addrs.sort_by_key(|a| a.is_ipv4()),
            Self::Ipv4Only => addrs.retain(SocketAddr::is_ipv4),
            Self::Ipv6Only => addrs.retain(SocketAddr::is_ipv6),
        }
    }
}

/// Configuration for a [`Connection`](crate::Connection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Address family filter and ordering
    pub address_preference: AddressPreference,
    /// Longest wait for a single candidate address to accept
    pub connect_timeout: Duration,
    /// Bytes requested per read in [`Connection::read`](crate::Connection::read)
    pub read_chunk_size: usize,
    /// Full chunks read before the target buffer is grown again
    pub read_chunk_iterations: usize,
    /// Extra PEM trust anchors: a single file or a directory of files
    pub cert_path: Option<PathBuf>,
    /// Whether the bundled web PKI roots are trusted
    pub default_roots: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address_preference: AddressPreference::Any,
            connect_timeout: Duration::from_secs(10),
            read_chunk_size: 512,
            read_chunk_iterations: 4,
            cert_path: None,
            default_roots: true,
        }
    }
}

impl ConnectionConfig {
    /// Short connect timeout for local or latency-sensitive peers.
    pub fn fast_fail() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }

    /// Long connect timeout and bigger reads for slow links.
    pub fn high_latency() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_chunk_size: 4096,
            ..Self::default()
        }
    }

    /// Sets [`cert_path`](Self::cert_path).
    pub fn with_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_path = Some(path.into());
        self
    }

    /// Sets [`address_preference`](Self::address_preference).
    pub fn with_address_preference(mut self, preference: AddressPreference) -> Self {
        self.address_preference = preference;
        self
    }

    /// Bytes [`Connection::read`](crate::Connection::read) makes room for
    /// before reading.
    pub(crate) fn read_window(&self) -> usize {
        self.read_chunk_size.max(1) * self.read_chunk_iterations.max(1)
    }
}
