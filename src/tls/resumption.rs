// src/tls/resumption.rs
//! Per-connection session store handed to rustls.

use crate::session::{CachedSession, SessionToken};
use rustls::NamedGroup;
use rustls::client::{ClientSessionStore, Tls12ClientSessionValue, Tls13ClientSessionValue};
use rustls::pki_types::ServerName;
use std::sync::{Arc, Mutex, PoisonError};

/// Resumption state of exactly one connection.
///
/// Lookups fall back to the cached entry the slot was opened on; taking a
/// TLS 1.3 ticket removes it from that entry. Sessions the server issues
/// during this connection collect in the slot until
/// [`take_fresh`](Self::take_fresh) moves them out on close.
///
/// rustls keys its store by server name. A slot only ever serves one peer,
/// so the name is ignored.
#[derive(Debug, Default)]
pub struct SessionSlot {
    cached: Option<Arc<CachedSession>>,
    fresh: Mutex<SessionToken>,
}

impl SessionSlot {
    /// Creates a slot drawing on `cached`.
    pub fn new(cached: Option<Arc<CachedSession>>) -> Self {
        Self {
            cached,
            fresh: Mutex::new(SessionToken::default()),
        }
    }

    /// Moves out the sessions issued since the slot was opened.
    pub fn take_fresh(&self) -> SessionToken {
        self.with(std::mem::take)
    }

    fn with<R>(&self, f: impl FnOnce(&mut SessionToken) -> R) -> R {
        f(&mut self.fresh.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn with_cached<R>(&self, f: impl FnOnce(&mut SessionToken) -> Option<R>) -> Option<R> {
        self.cached.as_ref().and_then(|cached| cached.with(f))
    }
}

impl ClientSessionStore for SessionSlot {
    fn set_kx_hint(&self, _: ServerName<'static>, group: NamedGroup) {
        self.with(|t| t.kx_hint = Some(group));
    }

    fn kx_hint(&self, _: &ServerName<'_>) -> Option<NamedGroup> {
        self.with(|t| t.kx_hint)
            .or_else(|| self.with_cached(|t| t.kx_hint))
    }

    fn set_tls12_session(&self, _: ServerName<'static>, value: Tls12ClientSessionValue) {
        self.with(|t| t.tls12 = Some(value));
    }

    fn tls12_session(&self, _: &ServerName<'_>) -> Option<Tls12ClientSessionValue> {
        self.with(|t| t.tls12.clone())
            .or_else(|| self.with_cached(|t| t.tls12.clone()))
    }

    fn remove_tls12_session(&self, _: &ServerName<'static>) {
        self.with(|t| t.tls12 = None);
        self.with_cached(|t| t.tls12.take());
    }

    fn insert_tls13_ticket(&self, _: ServerName<'static>, value: Tls13ClientSessionValue) {
        self.with(|t| t.push_ticket(value));
    }

    fn take_tls13_ticket(&self, _: &ServerName<'static>) -> Option<Tls13ClientSessionValue> {
        self.with(|t| t.tls13.pop_back())
            .or_else(|| self.with_cached(|t| t.tls13.pop_back()))
    }
}
