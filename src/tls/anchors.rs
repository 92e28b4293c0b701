// src/tls/anchors.rs
//! Trust anchor loading.

use crate::config::ConnectionConfig;
use crate::error::ConnectError;
use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn web_pki_roots() -> &'static RootCertStore {
    static INSTANCE: OnceLock<RootCertStore> = OnceLock::new();
    INSTANCE.get_or_init(|| RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    })
}

/// Builds the root store for a connection: the bundled web PKI roots if
/// enabled, plus every certificate found under `config.cert_path`.
///
/// # Errors
///
/// Returns [`ConnectError::InvalidCertPath`] if the path cannot be read or
/// holds no usable certificate.
pub fn root_store(config: &ConnectionConfig) -> Result<RootCertStore, ConnectError> {
    let mut store = if config.default_roots {
        web_pki_roots().clone()
    } else {
        RootCertStore::empty()
    };

    if let Some(path) = &config.cert_path {
        let certs = load_certificates(path)
            .ok_or_else(|| ConnectError::InvalidCertPath(path.clone()))?;
        let (added, ignored) = store.add_parsable_certificates(certs);
        if ignored > 0 {
            warn!(path = %path.display(), ignored, "skipped unparsable certificates");
        }
        if added == 0 {
            return Err(ConnectError::InvalidCertPath(path.clone()));
        }
        debug!(path = %path.display(), added, "loaded trust anchors");
    }

    Ok(store)
}

/// Reads PEM certificates from a file, or from every regular file in a
/// directory. `None` if nothing could be read.
fn load_certificates(path: &Path) -> Option<Vec<CertificateDer<'static>>> {
    let meta = fs::metadata(path).ok()?;
    let certs: Vec<_> = if meta.is_dir() {
        let mut files: Vec<_> = fs::read_dir(path)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        files.iter().flat_map(|file| pem_certificates(file)).collect()
    } else {
        pem_certificates(path)
    };

    (!certs.is_empty()).then_some(certs)
}

fn pem_certificates(file: &Path) -> Vec<CertificateDer<'static>> {
    match fs::read(file) {
        Ok(bytes) => CertificateDer::pem_slice_iter(&bytes)
            .filter_map(Result::ok)
            .collect(),
        Err(e) => {
            debug!(file = %file.display(), error = %e, "unreadable certificate file");
            Vec::new()
        }
    }
}
