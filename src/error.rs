// src/error.rs
//! Error types for buffer and connection operations

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Errors that can occur during buffer operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Requested capacity exceeds the allowed maximum
    SizeTooBig {
        /// Capacity that was asked for
        requested: usize,
        /// Largest capacity a buffer may reach
        max: usize,
    },
    /// Input ended before a complete value could be read
    Truncated {
        /// Bytes the value needs
        needed: usize,
        /// Bytes that were actually available
        available: usize,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeTooBig { requested, max } => {
                write!(f, "Buffer size {} exceeds maximum {}", requested, max)
            }
            Self::Truncated { needed, available } => write!(
                f,
                "Truncated input: needed {} bytes, {} available",
                needed, available
            ),
        }
    }
}

impl std::error::Error for BufferError {}

/// Convert BufferError to std::io::Error
impl From<BufferError> for std::io::Error {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::SizeTooBig { .. } => std::io::Error::new(ErrorKind::OutOfMemory, err),
            BufferError::Truncated { .. } => std::io::Error::new(ErrorKind::UnexpectedEof, err),
        }
    }
}

/// Result type alias for buffer operations
pub type Result<T> = std::result::Result<T, BufferError>;

/// Reasons a [`Connection::connect`](crate::Connection::connect) attempt fails.
///
/// A failed attempt leaves the connection in its previous state, so the same
/// value can be connected again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Host could not be resolved, resolved to nothing usable, or resolved to
    /// the name-collision address `127.0.53.53`
    Resolve,
    /// Local resources ran out while creating a socket
    Internal(String),
    /// No candidate address accepted the connection
    Connect,
    /// The configured certificate path could not be loaded
    InvalidCertPath(PathBuf),
    /// The peer certificate was rejected
    SslVerify(String),
    /// Any other TLS failure
    SslGeneral(String),
}

impl ConnectError {
    /// Returns `true` for failures raised by the TLS layer.
    pub fn is_tls(&self) -> bool {
        matches!(
            self,
            Self::InvalidCertPath(_) | Self::SslVerify(_) | Self::SslGeneral(_)
        )
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => write!(f, "Could not resolve host"),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
            Self::Connect => write!(f, "Could not connect to any address"),
            Self::InvalidCertPath(path) => {
                write!(f, "Invalid certificate path: {}", path.display())
            }
            Self::SslVerify(msg) => write!(f, "Certificate verification failed: {}", msg),
            Self::SslGeneral(msg) => write!(f, "TLS error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectError {}

/// Convert ConnectError to std::io::Error
impl From<ConnectError> for std::io::Error {
    fn from(err: ConnectError) -> Self {
        let kind = match err {
            ConnectError::Resolve => ErrorKind::NotFound,
            ConnectError::Internal(_) => ErrorKind::OutOfMemory,
            ConnectError::Connect => ErrorKind::ConnectionRefused,
            ConnectError::InvalidCertPath(_) => ErrorKind::InvalidInput,
            ConnectError::SslVerify(_) | ConnectError::SslGeneral(_) => ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, err)
    }
}
