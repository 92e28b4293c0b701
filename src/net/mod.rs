// src/net/mod.rs
//! Socket seam used by [`Connection`](crate::Connection).
//!
//! [`SocketLayer`] is the only way a connection touches the network, so the
//! connect state machine can be driven by a scripted layer in tests.

use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[cfg(unix)]
mod system;

#[cfg(unix)]
pub use system::SystemSockets;

/// Address returned by resolvers for names caught in an ICANN name collision.
pub const NAME_COLLISION_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 53, 53));

/// Outcome of starting a connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectProgress {
    /// The connection is established
    Connected,
    /// The connection is pending; wait for writability
    InProgress,
}

/// Synchronous socket operations.
pub trait SocketLayer {
    /// An open socket. Reads and writes block.
    type Socket: Read + Write + Send;

    /// Resolves `host` to candidate addresses in resolver order.
    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;

    /// Creates a non-blocking stream socket for `addr`'s family.
    fn open(&self, addr: &SocketAddr) -> io::Result<Self::Socket>;

    /// Starts connecting `socket` to `addr`.
    fn connect(&self, socket: &Self::Socket, addr: &SocketAddr) -> io::Result<ConnectProgress>;

    /// Waits up to `timeout` for `socket` to become writable. `Ok(false)`
    /// means the wait timed out.
    fn wait_writable(&self, socket: &Self::Socket, timeout: Duration) -> io::Result<bool>;

    /// Takes the socket's pending error, if any.
    fn take_error(&self, socket: &Self::Socket) -> io::Result<Option<io::Error>>;

    /// Switches `socket` to blocking mode.
    fn set_blocking(&self, socket: &Self::Socket) -> io::Result<()>;

    /// Shuts down both directions. Errors are ignored.
    fn shutdown(&self, socket: &Self::Socket);

    /// Releases the socket.
    fn close(&self, socket: Self::Socket);
}

/// Returns `true` if `err` means the process or system ran out of sockets,
/// buffers or memory, as opposed to a problem with one address.
pub fn is_local_exhaustion(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::OutOfMemory {
        return true;
    }
    #[cfg(unix)]
    if let Some(code) = err.raw_os_error() {
        return matches!(
            code,
            libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM
        );
    }
    false
}
