// src/tls/verifier.rs
//! Certificate verifier that lets the trust store override chain validation.

use super::public_key_of;
use crate::trust::{TrustDecision, TrustStore};
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{WebPkiSupportedAlgorithms, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, Error, SignatureScheme};
use std::sync::Arc;
use tracing::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Consults the [`TrustStore`] before falling back to web PKI validation.
///
/// A `Deny` on any presented certificate rejects the chain. An `Allow`
/// accepts it only when it is pinned on the end-entity key or on an issuer
/// reached from the end entity by following actual signatures through the
/// presented intermediates. Otherwise the web PKI result is returned
/// unchanged.
#[derive(Debug)]
pub struct TrustVerifier {
    trust: Arc<TrustStore>,
    webpki: Option<Arc<WebPkiServerVerifier>>,
    supported_algs: WebPkiSupportedAlgorithms,
}

impl TrustVerifier {
    /// Creates a verifier. Without a web PKI verifier, undecided chains are
    /// rejected as having an unknown issuer.
    pub fn new(
        trust: Arc<TrustStore>,
        webpki: Option<Arc<WebPkiServerVerifier>>,
        supported_algs: WebPkiSupportedAlgorithms,
    ) -> Self {
        Self {
            trust,
            webpki,
            supported_algs,
        }
    }

    fn pinned(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
    ) -> TrustDecision {
        let denied = std::iter::once(end_entity)
            .chain(intermediates)
            .filter_map(|cert| public_key_of(cert))
            .any(|key| self.trust.decide(&key) == TrustDecision::Deny);
        if denied {
            return TrustDecision::Deny;
        }
        if self.allowed_path(end_entity, intermediates) {
            TrustDecision::Allow
        } else {
            TrustDecision::Undecided
        }
    }

    /// Walks from the end entity towards its issuers, stopping at the first
    /// allowed key. Each step must be a presented certificate whose subject
    /// names the current issuer and whose key verifies the current signature.
    fn allowed_path(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
    ) -> bool {
        let Ok((_, leaf)) = X509Certificate::from_der(end_entity) else {
            return false;
        };
        let issuers: Vec<X509Certificate<'_>> = intermediates
            .iter()
            .filter_map(|der| X509Certificate::from_der(der).ok().map(|(_, cert)| cert))
            .collect();

        let mut current = &leaf;
        let mut visited = vec![false; issuers.len()];
        loop {
            if self.trust.decide(current.public_key().raw) == TrustDecision::Allow {
                return true;
            }
            let next = issuers.iter().enumerate().find(|(i, issuer)| {
                !visited[*i]
                    && issuer.subject().as_raw() == current.issuer().as_raw()
                    && current.verify_signature(Some(issuer.public_key())).is_ok()
            });
            match next {
                Some((i, issuer)) => {
                    visited[i] = true;
                    current = issuer;
                }
                None => return false,
            }
        }
    }
}

impl ServerCertVerifier for TrustVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        match self.pinned(end_entity, intermediates) {
            TrustDecision::Deny => {
                debug!(server = ?server_name, "certificate denied by trust store");
                Err(Error::InvalidCertificate(
                    CertificateError::ApplicationVerificationFailure,
                ))
            }
            TrustDecision::Allow => {
                debug!(server = ?server_name, "certificate allowed by trust store");
                Ok(ServerCertVerified::assertion())
            }
            TrustDecision::Undecided => match &self.webpki {
                Some(webpki) => webpki.verify_server_cert(
                    end_entity,
                    intermediates,
                    server_name,
                    ocsp_response,
                    now,
                ),
                None => Err(Error::InvalidCertificate(CertificateError::UnknownIssuer)),
            },
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls12_signature(message, cert, dss, &self.supported_algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls13_signature(message, cert, dss, &self.supported_algs)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_algs.supported_schemes()
    }
}
