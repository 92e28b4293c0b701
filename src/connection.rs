// src/connection.rs
//! Blocking TCP client connections with optional TLS.
//!
//! A [`Connection`] resolves its host, tries each address in turn with a
//! bounded wait, optionally runs a TLS handshake that consults the shared
//! [`TrustStore`](crate::TrustStore) and offers a cached session, and then
//! moves bytes between the socket and caller-owned [`Buffer`]s.

use crate::buffer::Buffer;
use crate::config::ConnectionConfig;
use crate::context::SecureContext;
use crate::error::ConnectError;
use crate::net::{ConnectProgress, NAME_COLLISION_ADDR, SocketLayer, is_local_exhaustion};
use crate::session::PeerIdentity;
use crate::trust::TrustDecision;
use crate::tls::{self, SessionSlot};
use rustls::pki_types::ServerName;
use rustls::{ClientConnection, HandshakeKind, StreamOwned};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[cfg(unix)]
use crate::net::SystemSockets;

/// Where a connection is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Never connected
    #[default]
    Unknown,
    /// Ready for reads and writes
    Connected,
    /// Closed after having been connected
    Unconnected,
}

/// Address family of the established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Not connected yet
    #[default]
    Unset,
    /// IPv4
    Ipv4,
    /// IPv6
    Ipv6,
}

impl From<&SocketAddr> for Protocol {
    fn from(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => Self::Ipv4,
            SocketAddr::V6(_) => Self::Ipv6,
        }
    }
}

enum Channel<T: Read + Write> {
    Plain(T),
    Tls(Box<StreamOwned<ClientConnection, T>>),
}

impl<T: Read + Write> Read for Channel<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(sock) => sock.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl<T: Read + Write> Write for Channel<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(sock) => sock.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(sock) => sock.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

/// A client connection to one `host:port`.
///
/// Construction does no I/O. [`connect`](Self::connect) establishes the
/// connection, [`close`](Self::close) (or dropping) tears it down and, for
/// TLS, saves the session for the next connection to the same peer.
///
/// # Examples
///
/// ```no_run
/// use secnet::{Buffer, Connection};
///
/// let mut conn = Connection::new("example.com", 443, true);
/// conn.connect()?;
///
/// let request = Buffer::from_slice(b"GET / HTTP/1.0\r\nHost: example.com\r\n\r\n");
/// assert!(conn.write(&request));
///
/// let mut response = Buffer::default();
/// while conn.read(&mut response, 0) {}
/// conn.close();
/// # Ok::<(), secnet::ConnectError>(())
/// ```
pub struct Connection<L: SocketLayer> {
    host: String,
    port: u16,
    tls: bool,
    config: ConnectionConfig,
    context: SecureContext,
    layer: L,
    channel: Option<Channel<L::Socket>>,
    slot: Option<Arc<SessionSlot>>,
    peer_addr: Option<SocketAddr>,
    protocol: Protocol,
    status: Status,
    resumed: bool,
}

#[cfg(unix)]
impl Connection<SystemSockets> {
    /// Creates a connection using system sockets, default configuration and
    /// the process-wide [`SecureContext`].
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self::with_config(host, port, tls, ConnectionConfig::default())
    }

    /// Creates a connection using system sockets and the process-wide
    /// [`SecureContext`].
    pub fn with_config(
        host: impl Into<String>,
        port: u16,
        tls: bool,
        config: ConnectionConfig,
    ) -> Self {
        Self::with_layer(SystemSockets, host, port, tls, config, SecureContext::global())
    }
}

impl<L: SocketLayer> Connection<L> {
    /// Creates a connection over an arbitrary socket layer and context.
    pub fn with_layer(
        layer: L,
        host: impl Into<String>,
        port: u16,
        tls: bool,
        config: ConnectionConfig,
        context: SecureContext,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
            config,
            context,
            layer,
            channel: None,
            slot: None,
            peer_addr: None,
            protocol: Protocol::Unset,
            status: Status::Unknown,
            resumed: false,
        }
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Address family of the last successful connect.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Whether the connection uses TLS.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address the connection was established to.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Whether the last handshake resumed a cached session.
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// Key under which this connection's session is cached.
    pub fn identity(&self) -> PeerIdentity {
        PeerIdentity::new(self.host.clone(), self.port, self.tls)
    }

    /// Establishes the connection. Does nothing if already connected.
    ///
    /// On failure the status is left as it was and no socket stays open.
    ///
    /// # Errors
    ///
    /// See [`ConnectError`] for the meaning of each variant.
    #[instrument(skip(self), fields(host = %self.host, port = self.port, tls = self.tls))]
    pub fn connect(&mut self) -> Result<(), ConnectError> {
        if self.status == Status::Connected {
            return Ok(());
        }

        let candidates = self.resolve()?;
        let (socket, addr) = self.open_first(&candidates)?;

        let channel = if self.tls {
            Channel::Tls(Box::new(self.handshake(socket)?))
        } else {
            Channel::Plain(socket)
        };

        self.channel = Some(channel);
        self.peer_addr = Some(addr);
        self.protocol = Protocol::from(&addr);
        self.status = Status::Connected;
        info!(%addr, resumed = self.resumed, "connected");
        Ok(())
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, ConnectError> {
        let mut addrs = self.layer.resolve(&self.host, self.port).map_err(|e| {
            debug!(error = %e, "resolution failed");
            ConnectError::Resolve
        })?;

        if addrs.iter().any(|a| a.ip() == NAME_COLLISION_ADDR) {
            warn!("resolver returned the name collision address");
            return Err(ConnectError::Resolve);
        }

        self.config.address_preference.apply(&mut addrs);
        if addrs.is_empty() {
            debug!("no usable addresses");
            return Err(ConnectError::Resolve);
        }
        Ok(addrs)
    }

    /// Tries each candidate in order. Only sockets of failed candidates are
    /// closed here.
    fn open_first(&self, candidates: &[SocketAddr]) -> Result<(L::Socket, SocketAddr), ConnectError> {
        for addr in candidates {
            let socket = match self.layer.open(addr) {
                Ok(socket) => socket,
                Err(e) if is_local_exhaustion(&e) => {
                    warn!(%addr, error = %e, "out of local resources");
                    return Err(ConnectError::Internal(e.to_string()));
                }
                Err(e) => {
                    debug!(%addr, error = %e, "could not create socket");
                    continue;
                }
            };

            match self.attempt(&socket, addr) {
                Ok(()) => return Ok((socket, *addr)),
                Err(e) => {
                    debug!(%addr, error = %e, "candidate failed");
                    self.layer.close(socket);
                }
            }
        }
        Err(ConnectError::Connect)
    }

    fn attempt(&self, socket: &L::Socket, addr: &SocketAddr) -> io::Result<()> {
        if self.layer.connect(socket, addr)? == ConnectProgress::InProgress {
            if !self.layer.wait_writable(socket, self.config.connect_timeout)? {
                return Err(io::ErrorKind::TimedOut.into());
            }
            if let Some(e) = self.layer.take_error(socket)? {
                return Err(e);
            }
        }
        self.layer.set_blocking(socket)
    }

    fn handshake(
        &mut self,
        mut socket: L::Socket,
    ) -> Result<StreamOwned<ClientConnection, L::Socket>, ConnectError> {
        let slot = Arc::new(SessionSlot::new(self.context.sessions.load(&self.identity())));

        let started = tls::client_config(&self.context, &self.config, Arc::clone(&slot))
            .and_then(|config| {
                let name = ServerName::try_from(self.host.clone())
                    .map_err(|e| ConnectError::SslGeneral(e.to_string()))?;
                ClientConnection::new(config, name)
                    .map_err(|e| ConnectError::SslGeneral(e.to_string()))
            });
        let mut session = match started {
            Ok(session) => session,
            Err(e) => {
                self.abandon(socket);
                return Err(e);
            }
        };

        while session.is_handshaking() {
            if let Err(e) = session.complete_io(&mut socket) {
                let err = tls::classify_handshake_error(&e);
                warn!(error = %e, "handshake failed");
                self.abandon(socket);
                return Err(err);
            }
        }

        self.resumed = session.handshake_kind() == Some(HandshakeKind::Resumed);
        if self.resumed {
            // Resumed handshakes skip certificate verification.
            if self.denied_peer(&session) {
                warn!("resumed session belongs to a denied certificate");
                self.resumed = false;
                self.context.sessions.remove(&self.identity());
                self.abandon(socket);
                return Err(ConnectError::SslVerify(
                    "resumed session certificate denied by trust store".to_string(),
                ));
            }
            self.context.sessions.record_resumption();
        }
        self.slot = Some(slot);
        Ok(StreamOwned::new(session, socket))
    }

    fn denied_peer(&self, session: &ClientConnection) -> bool {
        session
            .peer_certificates()
            .unwrap_or_default()
            .iter()
            .filter_map(|cert| tls::public_key_of(cert))
            .any(|key| self.context.trust.decide(&key) == TrustDecision::Deny)
    }

    fn abandon(&self, socket: L::Socket) {
        self.layer.shutdown(&socket);
        self.layer.close(socket);
    }

    /// Tears the connection down. Returns `false` if it was not connected.
    ///
    /// For TLS the sessions the server issued during this connection replace
    /// the cached entry for this peer (when there are any) and close_notify
    /// is sent.
    pub fn close(&mut self) -> bool {
        let Some(channel) = self.channel.take() else {
            return false;
        };

        let socket = match channel {
            Channel::Plain(socket) => socket,
            Channel::Tls(stream) => {
                self.save_session();
                let (mut session, mut socket) = stream.into_parts();
                session.send_close_notify();
                if let Err(e) = session.complete_io(&mut socket) {
                    debug!(error = %e, "close_notify not delivered");
                }
                socket
            }
        };

        self.abandon(socket);
        self.status = Status::Unconnected;
        debug!(host = %self.host, port = self.port, "closed");
        true
    }

    fn save_session(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        let token = slot.take_fresh();
        if !token.is_empty() {
            self.context.sessions.save(self.identity(), token);
        }
    }

    /// Reads greedily into `buffer`.
    ///
    /// Reads in chunks of `read_chunk_size` bytes until a chunk comes back
    /// short or at least `min` bytes were read in this call. Returns `false`
    /// if not connected, if the peer shut down, or on error; bytes read before
    /// that stay in `buffer`.
    pub fn read(&mut self, buffer: &mut Buffer, min: usize) -> bool {
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        let chunk = self.config.read_chunk_size.max(1);
        let window = self.config.read_window();
        let mut total = 0;

        loop {
            if let Err(e) = buffer.increase(window, true) {
                debug!(error = %e, "cannot grow read buffer");
                return false;
            }

            for _ in 0..window / chunk {
                match read_retrying(channel, &mut buffer.spare_capacity_mut()[..chunk]) {
                    Ok(0) => {
                        debug!("peer closed the connection");
                        return false;
                    }
                    Ok(n) => {
                        buffer.mark_used(n);
                        total += n;
                        if n != chunk || total >= min {
                            return true;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "read failed");
                        return false;
                    }
                }
            }
        }
    }

    /// Performs one read of at most `size` bytes into `buffer`.
    ///
    /// `Ok(0)` means the peer shut down.
    pub fn read_max(&mut self, buffer: &mut Buffer, size: usize) -> io::Result<usize> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };
        buffer.increase(size, true)?;
        let n = read_retrying(channel, &mut buffer.spare_capacity_mut()[..size])?;
        buffer.mark_used(n);
        Ok(n)
    }

    /// Reads exactly `size` bytes into `buffer`.
    ///
    /// Returns `false` if the peer shut down or an error occurred first.
    pub fn read_exactly(&mut self, buffer: &mut Buffer, size: usize) -> bool {
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        if buffer.increase(size, true).is_err() {
            return false;
        }

        let mut remaining = size;
        while remaining > 0 {
            match read_retrying(channel, &mut buffer.spare_capacity_mut()[..remaining]) {
                Ok(0) => return false,
                Ok(n) => {
                    buffer.mark_used(n);
                    remaining -= n;
                }
                Err(e) => {
                    debug!(error = %e, "read failed");
                    return false;
                }
            }
        }
        true
    }

    /// Writes the whole window of `buffer` in a single write.
    ///
    /// Returns `true` only if every byte was accepted.
    pub fn write(&mut self, buffer: &Buffer) -> bool {
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        let accepted = match channel.write(buffer.as_slice()) {
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "write failed");
                return false;
            }
        };
        if let Err(e) = channel.flush() {
            debug!(error = %e, "flush failed");
            return false;
        }
        accepted == buffer.len()
    }
}

fn read_retrying(reader: &mut impl Read, into: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(into) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

impl<L: SocketLayer> Drop for Connection<L> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<L: SocketLayer> std::fmt::Debug for Connection<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("status", &self.status)
            .field("protocol", &self.protocol)
            .finish()
    }
}
