//! TCP listener setup.

use crate::connection::SocketHandle;
use crate::error::{NetworkError, SocketOp};
use futures::FutureExt;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::trace;

/// Requested accept backlog; the kernel clamps it to its own maximum.
const LISTEN_BACKLOG: i32 = 65535;

/// The bound, listening stream socket.
///
/// Any failure while building the socket drops it, so a half-configured
/// descriptor never outlives [`StreamListener::bind`].
#[derive(Debug)]
pub struct StreamListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl StreamListener {
    /// Creates a non-blocking socket, binds and listens on `addr`, then
    /// applies `send_buffer_size` as SO_SNDBUF.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(addr: SocketAddr, send_buffer_size: usize) -> Result<Self, NetworkError> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| NetworkError::socket(SocketOp::Create, e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| NetworkError::socket(SocketOp::NonBlocking, e))?;

        // Lets a restarted server rebind while old connections sit in TIME_WAIT
        #[cfg(unix)]
        socket
            .set_reuse_address(true)
            .map_err(|e| NetworkError::socket(SocketOp::ReuseAddress, e))?;

        socket
            .bind(&addr.into())
            .map_err(|e| NetworkError::socket(SocketOp::Bind, e))?;

        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| NetworkError::socket(SocketOp::Listen, e))?;

        socket
            .set_send_buffer_size(send_buffer_size)
            .map_err(|e| NetworkError::socket(SocketOp::SendBufferSize, e))?;

        let listener = TcpListener::from_std(socket.into())
            .map_err(|e| NetworkError::socket(SocketOp::Register, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| NetworkError::socket(SocketOp::LocalAddress, e))?;

        trace!("✅ Stream listener bound on {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Waits until a connection is pending and accepts it.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept().await
    }

    /// Accepts a connection only if one is already queued.
    ///
    /// tokio is polled once; if its reactor has not seen the listener become
    /// readable yet, the kernel's accept queue is checked directly.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no connection is pending.
    pub fn try_accept(&self) -> io::Result<Option<(TcpStream, SocketAddr)>> {
        if let Some(accepted) = self.listener.accept().now_or_never() {
            return accepted.map(Some);
        }

        let (socket, peer) = match SockRef::from(&self.listener).accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(e),
        };
        socket.set_nonblocking(true)?;
        let peer = peer.as_socket().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "peer address is not an IP address")
        })?;
        let stream = TcpStream::from_std(socket.into())?;
        Ok(Some((stream, peer)))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> SocketHandle {
        SocketHandle::of(&self.listener)
    }
}
