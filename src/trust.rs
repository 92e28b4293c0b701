// src/trust.rs
//! Per-key trust decisions consulted during certificate verification.
//!
//! Keys are the DER-encoded `SubjectPublicKeyInfo` of a certificate, as
//! returned by [`public_key_of`](crate::tls::public_key_of).

use crossbeam::sync::ShardedLock;
use std::collections::HashMap;
use std::sync::PoisonError;

/// What to do with a certificate whose key is known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrustDecision {
    /// Accept the certificate regardless of chain validation
    Allow,
    /// Reject the certificate regardless of chain validation
    Deny,
    /// Defer to standard chain validation
    #[default]
    Undecided,
}

/// Thread-safe map from public key to [`TrustDecision`].
///
/// Lookups vastly outnumber updates, so the map sits behind a sharded
/// reader-writer lock.
///
/// # Examples
///
/// ```
/// use secnet::{TrustDecision, TrustStore};
///
/// let store = TrustStore::new();
/// assert_eq!(store.decide(b"key"), TrustDecision::Undecided);
///
/// store.pin(b"key".to_vec(), TrustDecision::Deny);
/// assert_eq!(store.decide(b"key"), TrustDecision::Deny);
/// ```
#[derive(Default)]
pub struct TrustStore {
    pins: ShardedLock<HashMap<Vec<u8>, TrustDecision>>,
}

impl TrustStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the decision for `public_key`. Unknown keys are
    /// [`TrustDecision::Undecided`].
    pub fn decide(&self, public_key: &[u8]) -> TrustDecision {
        let pins = self.pins.read().unwrap_or_else(PoisonError::into_inner);
        pins.get(public_key).copied().unwrap_or_default()
    }

    /// Records a decision for `public_key`, replacing any previous one.
    /// Pinning [`TrustDecision::Undecided`] is the same as [`unpin`](Self::unpin).
    pub fn pin(&self, public_key: Vec<u8>, decision: TrustDecision) {
        let mut pins = self.pins.write().unwrap_or_else(PoisonError::into_inner);
        match decision {
            TrustDecision::Undecided => {
                pins.remove(&public_key);
            }
            _ => {
                pins.insert(public_key, decision);
            }
        }
    }

    /// Forgets the decision for `public_key` and returns it.
    pub fn unpin(&self, public_key: &[u8]) -> Option<TrustDecision> {
        self.pins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(public_key)
    }

    /// Number of pinned keys.
    pub fn len(&self) -> usize {
        self.pins.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no key is pinned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every pinned key.
    pub fn clear(&self) {
        self.pins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("pinned", &self.len())
            .finish()
    }
}
