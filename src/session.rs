// src/session.rs
//! TLS session cache shared by connections.
//!
//! A connection's session is saved when it closes and offered again the next
//! time a connection to the same [`PeerIdentity`] is made.

use rustls::NamedGroup;
use rustls::client::{Tls12ClientSessionValue, Tls13ClientSessionValue};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Most TLS 1.3 tickets kept per peer.
pub const MAX_TLS13_TICKETS: usize = 8;

/// The `(host, port, tls)` triple a cached session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerIdentity {
    /// Host name as given to the connection
    pub host: String,
    /// Port number
    pub port: u16,
    /// Whether the connection was TLS
    pub tls: bool,
}

impl PeerIdentity {
    /// Creates an identity.
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.tls { "tls" } else { "tcp" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Opaque resumption state for one peer.
///
/// TLS 1.3 tickets are single use, so a token is moved rather than copied.
#[derive(Debug, Default)]
pub struct SessionToken {
    pub(crate) tls12: Option<Tls12ClientSessionValue>,
    pub(crate) tls13: VecDeque<Tls13ClientSessionValue>,
    pub(crate) kx_hint: Option<NamedGroup>,
}

impl SessionToken {
    /// Returns `true` if the token holds nothing a handshake could resume.
    pub fn is_empty(&self) -> bool {
        self.tls12.is_none() && self.tls13.is_empty()
    }

    /// Number of TLS 1.3 tickets held.
    pub fn ticket_count(&self) -> usize {
        self.tls13.len()
    }

    /// Whether a TLS 1.2 session is held.
    pub fn has_tls12_session(&self) -> bool {
        self.tls12.is_some()
    }

    pub(crate) fn push_ticket(&mut self, ticket: Tls13ClientSessionValue) {
        if self.tls13.len() == MAX_TLS13_TICKETS {
            self.tls13.pop_front();
        }
        self.tls13.push_back(ticket);
    }
}

/// A cached [`SessionToken`] shared between the cache and the handshakes
/// drawing on it.
///
/// Each TLS 1.3 ticket is handed to at most one handshake and is removed from
/// the entry when taken. The entry itself stays cached until it is
/// overwritten or removed.
#[derive(Debug, Default)]
pub struct CachedSession {
    token: Mutex<SessionToken>,
}

impl CachedSession {
    fn new(token: SessionToken) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    /// Returns `true` if nothing is left to resume from.
    pub fn is_empty(&self) -> bool {
        self.with(|t| t.is_empty())
    }

    /// Number of TLS 1.3 tickets not yet taken.
    pub fn ticket_count(&self) -> usize {
        self.with(|t| t.ticket_count())
    }

    /// Whether a TLS 1.2 session is held.
    pub fn has_tls12_session(&self) -> bool {
        self.with(|t| t.has_tls12_session())
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut SessionToken) -> R) -> R {
        f(&mut self.token.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Thread-safe map from [`PeerIdentity`] to [`CachedSession`], plus a counter
/// of resumed handshakes.
///
/// # Examples
///
/// ```
/// use secnet::{PeerIdentity, SessionCache};
///
/// let cache = SessionCache::new();
/// let peer = PeerIdentity::new("example.com", 443, true);
/// assert!(cache.load(&peer).is_none());
/// assert_eq!(cache.resumed_count(), 0);
/// ```
#[derive(Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<PeerIdentity, Arc<CachedSession>>>,
    resumed: AtomicU64,
}

impl SessionCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `token` for `peer`, replacing any previous entry.
    pub fn save(&self, peer: PeerIdentity, token: SessionToken) {
        debug!(%peer, tickets = token.ticket_count(), "saving session");
        self.lock().insert(peer, Arc::new(CachedSession::new(token)));
    }

    /// Returns the entry for `peer`. The entry stays cached.
    pub fn load(&self, peer: &PeerIdentity) -> Option<Arc<CachedSession>> {
        self.lock().get(peer).cloned()
    }

    /// Drops the entry for `peer`.
    pub fn remove(&self, peer: &PeerIdentity) -> Option<Arc<CachedSession>> {
        self.lock().remove(peer)
    }

    /// Number of handshakes that resumed a cached session.
    pub fn resumed_count(&self) -> u64 {
        self.resumed.load(Ordering::Relaxed)
    }

    /// Counts one resumed handshake.
    pub fn record_resumption(&self) {
        self.resumed.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of cached peers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no peer is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. The resumption counter is kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PeerIdentity, Arc<CachedSession>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCache")
            .field("peers", &self.len())
            .field("resumed", &self.resumed_count())
            .finish()
    }
}
