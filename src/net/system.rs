// src/net/system.rs
//! Operating-system sockets.

use super::{ConnectProgress, SocketLayer};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

/// [`SocketLayer`] backed by the system resolver and `socket2` sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSockets;

impl SocketLayer for SystemSockets {
    type Socket = Socket;

    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok((host, port).to_socket_addrs()?.collect())
    }

    fn open(&self, addr: &SocketAddr) -> io::Result<Socket> {
        let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nonblocking(true)?;
        Ok(socket)
    }

    fn connect(&self, socket: &Socket, addr: &SocketAddr) -> io::Result<ConnectProgress> {
        match socket.connect(&SockAddr::from(*addr)) {
            Ok(()) => Ok(ConnectProgress::Connected),
            Err(e)
                if e.raw_os_error() == Some(libc::EINPROGRESS)
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(ConnectProgress::InProgress)
            }
            Err(e) => Err(e),
        }
    }

    fn wait_writable(&self, socket: &Socket, timeout: Duration) -> io::Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut fds = libc::pollfd {
            fd: socket.as_raw_fd(),
            events: libc::POLLOUT,
            revents: 0,
        };

        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            let millis = libc::c_int::try_from(left.as_millis()).unwrap_or(libc::c_int::MAX);
            // SAFETY: `fds` is a single valid pollfd that outlives the call.
            let ready = unsafe { libc::poll(&mut fds, 1, millis) };
            match ready {
                0 => return Ok(false),
                n if n > 0 => return Ok(true),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() != io::ErrorKind::Interrupted {
                        return Err(err);
                    }
                }
            }
        }
    }

    fn take_error(&self, socket: &Socket) -> io::Result<Option<io::Error>> {
        socket.take_error()
    }

    fn set_blocking(&self, socket: &Socket) -> io::Result<()> {
        socket.set_nonblocking(false)
    }

    fn shutdown(&self, socket: &Socket) {
        let _ = socket.shutdown(Shutdown::Both);
    }

    fn close(&self, socket: Socket) {
        drop(socket);
    }
}
