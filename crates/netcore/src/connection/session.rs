//! Per-client session state.
//!
//! A [`Session`] exclusively owns the accepted stream. Dropping the session
//! closes the socket, so a session can only ever be released once.

use super::{SessionId, SocketHandle};
use socket2::{SockRef, Socket};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::SystemTime;
use tokio::net::TcpStream;

/// Represents one accepted stream client.
///
/// # Fields
///
/// * `id` - Identifier supplied by the caller of accept
/// * `stream` - The owned, non-blocking stream socket
/// * `handle` - Descriptor of `stream`, fixed at construction
/// * `ip` - Textual peer address
/// * `seq` - Sequence counter for higher-layer ordering
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    stream: TcpStream,
    handle: SocketHandle,
    remote_addr: SocketAddr,
    ip: String,
    seq: u32,
    connected_at: SystemTime,
}

impl Session {
    /// Creates a session around an accepted stream.
    ///
    /// The IP string is taken from `remote_addr` and the sequence counter
    /// starts at zero.
    pub fn new(id: SessionId, stream: TcpStream, remote_addr: SocketAddr) -> Self {
        let handle = SocketHandle::of(&stream);
        Self {
            id,
            stream,
            handle,
            remote_addr,
            ip: remote_addr.ip().to_string(),
            seq: 0,
            connected_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn handle(&self) -> SocketHandle {
        self.handle
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Overrides the textual address, e.g. with one reported by a proxy.
    pub fn set_ip(&mut self, ip: impl Into<String>) {
        self.ip = ip.into();
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn reset_seq(&mut self) {
        self.seq = 0;
    }

    pub fn connected_at(&self) -> SystemTime {
        self.connected_at
    }

    pub(crate) fn stream(&self) -> &TcpStream {
        &self.stream
    }

    #[cfg(test)]
    pub(crate) fn with_handle(mut self, handle: SocketHandle) -> Self {
        self.handle = handle;
        self
    }

    /// Non-blocking read straight from the socket.
    ///
    /// tokio only attempts the syscall once its reactor has seen the socket
    /// become readable, so a `WouldBlock` from it is retried on the raw
    /// descriptor before being believed.
    pub(crate) fn read_now(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.try_read(buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                let socket = SockRef::from(&self.stream);
                let mut raw: &Socket = &socket;
                raw.read(buf)
            }
            other => other,
        }
    }

    /// Non-blocking write straight to the socket; see [`read_now`](Self::read_now).
    pub(crate) fn write_now(&self, buf: &[u8]) -> io::Result<usize> {
        match self.stream.try_write(buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                let socket = SockRef::from(&self.stream);
                let mut raw: &Socket = &socket;
                raw.write(buf)
            }
            other => other,
        }
    }
}
