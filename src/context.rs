// src/context.rs
//! Shared state handed to every connection.

use crate::session::SessionCache;
use crate::tls::ClientConfigCache;
use crate::trust::TrustStore;
use std::sync::{Arc, OnceLock};

/// The trust store and session cache a group of connections share.
///
/// Cloning is cheap and shares both stores. The context also keeps the TLS
/// client configurations its connections were built with, since a session can
/// only be resumed under the configuration that stored it.
#[derive(Debug, Clone, Default)]
pub struct SecureContext {
    /// Trust decisions consulted during verification
    pub trust: Arc<TrustStore>,
    /// Sessions offered for resumption
    pub sessions: Arc<SessionCache>,
    pub(crate) tls_configs: Arc<ClientConfigCache>,
}

impl SecureContext {
    /// Creates a context with empty stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide context used by [`Connection::new`](crate::Connection::new).
    pub fn global() -> Self {
        static GLOBAL: OnceLock<SecureContext> = OnceLock::new();
        GLOBAL.get_or_init(SecureContext::new).clone()
    }
}
