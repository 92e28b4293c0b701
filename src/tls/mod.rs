// src/tls/mod.rs
//! rustls glue: trust anchors, the trust-aware verifier, per-connection
//! session slots and handshake error classification.

mod anchors;
mod resumption;
mod verifier;

pub use anchors::root_store;
pub use resumption::SessionSlot;
pub use verifier::TrustVerifier;

use crate::config::ConnectionConfig;
use crate::context::SecureContext;
use crate::error::ConnectError;
use crate::trust::TrustStore;
use rustls::client::{Resumption, WebPkiServerVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, Error as TlsError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::{fmt, io};
use tracing::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    static INSTANCE: OnceLock<Arc<CryptoProvider>> = OnceLock::new();
    INSTANCE
        .get_or_init(|| Arc::new(rustls::crypto::ring::default_provider()))
        .clone()
}

/// Extracts the DER `SubjectPublicKeyInfo` of a certificate, the key
/// [`TrustStore`] decisions are pinned under.
///
/// Returns `None` if `cert_der` is not a parsable X.509 certificate.
pub fn public_key_of(cert_der: &[u8]) -> Option<Vec<u8>> {
    let (_, cert) = X509Certificate::from_der(cert_der).ok()?;
    Some(cert.public_key().raw.to_vec())
}

/// Client configurations built for one [`SecureContext`], keyed by the
/// trust anchor settings they were built from.
///
/// rustls only resumes a session under the same certificate verifier that
/// stored it, so every connection with the same settings starts from the same
/// base configuration.
#[derive(Default)]
pub(crate) struct ClientConfigCache {
    built: Mutex<HashMap<AnchorKey, (Arc<TrustStore>, Arc<ClientConfig>)>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AnchorKey {
    cert_path: Option<PathBuf>,
    default_roots: bool,
}

impl ClientConfigCache {
    fn base(
        &self,
        config: &ConnectionConfig,
        trust: &Arc<TrustStore>,
    ) -> Result<Arc<ClientConfig>, ConnectError> {
        let key = AnchorKey {
            cert_path: config.cert_path.clone(),
            default_roots: config.default_roots,
        };
        let mut built = self.built.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, base)) = built.get(&key).filter(|(owner, _)| Arc::ptr_eq(owner, trust)) {
            return Ok(Arc::clone(base));
        }

        let base = build_base(config, Arc::clone(trust))?;
        debug!(cert_path = ?key.cert_path, default_roots = key.default_roots, "built client config");
        built.insert(key, (Arc::clone(trust), Arc::clone(&base)));
        Ok(base)
    }

    pub(crate) fn len(&self) -> usize {
        self.built.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl fmt::Debug for ClientConfigCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigCache")
            .field("configs", &self.len())
            .finish()
    }
}

fn build_base(
    config: &ConnectionConfig,
    trust: Arc<TrustStore>,
) -> Result<Arc<ClientConfig>, ConnectError> {
    let roots = root_store(config)?;
    let provider = crypto_provider();

    let webpki = if roots.is_empty() {
        None
    } else {
        let verifier =
            WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
                .build()
                .map_err(|e| ConnectError::SslGeneral(e.to_string()))?;
        Some(verifier)
    };
    let verifier = TrustVerifier::new(trust, webpki, provider.signature_verification_algorithms);

    let tls = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ConnectError::SslGeneral(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    Ok(Arc::new(tls))
}

/// Builds the client configuration for one connection.
///
/// Everything but the session store is shared with earlier connections made
/// through `context` with the same trust anchor settings.
pub fn client_config(
    context: &SecureContext,
    config: &ConnectionConfig,
    slot: Arc<SessionSlot>,
) -> Result<Arc<ClientConfig>, ConnectError> {
    let base = context.tls_configs.base(config, &context.trust)?;
    let mut tls = ClientConfig::clone(&base);
    tls.resumption = Resumption::store(slot);
    Ok(Arc::new(tls))
}

/// Maps a failed handshake to a [`ConnectError`].
///
/// Certificate rejections are [`ConnectError::SslVerify`], other TLS errors
/// [`ConnectError::SslGeneral`]. A handshake cut short by the transport
/// with no TLS error is [`ConnectError::Connect`].
pub fn classify_handshake_error(err: &io::Error) -> ConnectError {
    match err.get_ref().and_then(|e| e.downcast_ref::<TlsError>()) {
        Some(tls @ TlsError::InvalidCertificate(_)) => ConnectError::SslVerify(tls.to_string()),
        Some(tls) => ConnectError::SslGeneral(tls.to_string()),
        None => ConnectError::Connect,
    }
}
