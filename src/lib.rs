// src/lib.rs
//! # Secure Client Transport
//!
//! Blocking TCP and TLS client connections built around secure byte buffers.
//!
//! Features:
//! - Growable buffers with a consumable front, zeroed with `zeroize` on every
//!   reallocation and on drop
//! - Length-prefixed encoding over borrowed buffer views
//! - Multi-address connect with a bounded per-address wait
//! - TLS via `rustls`, with per-key trust pinning that can override chain
//!   validation
//! - Session resumption through a cache shared between connections

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod net;
pub mod session;
pub mod tls;
pub mod trust;

// Re-export main types
pub use buffer::{Buffer, BufferRange, Serializable};
pub use config::{AddressPreference, ConnectionConfig};
pub use connection::{Connection, Protocol, Status};
pub use context::SecureContext;
pub use error::{BufferError, ConnectError, Result};
pub use session::{CachedSession, PeerIdentity, SessionCache, SessionToken};
pub use trust::{TrustDecision, TrustStore};

/// Commonly used imports.
pub mod prelude {
    pub use crate::buffer::{Buffer, BufferRange, Serializable};
    pub use crate::config::{AddressPreference, ConnectionConfig};
    pub use crate::connection::{Connection, Protocol, Status};
    pub use crate::context::SecureContext;
    pub use crate::error::{BufferError, ConnectError, Result};
    pub use crate::net::SocketLayer;
    pub use crate::session::{PeerIdentity, SessionCache};
    pub use crate::trust::{TrustDecision, TrustStore};
}
