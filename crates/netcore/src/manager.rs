//! The network manager: owner of both listeners and every live session.
//!
//! All mutating operations take `&mut self`, so the single-owner discipline
//! the event loop relies on is enforced by the borrow checker rather than by
//! locks. Send and receive never suspend; the only awaiting operations are
//! the readiness waits and accept, which is how the event loop multiplexes.

use crate::{
    config::NetworkConfig,
    connection::{Session, SessionId, SessionRegistry, SocketHandle},
    error::{NetworkError, SocketOp},
    listener::{resolve_bind_address, DatagramListener, StreamListener},
    reporter::{ErrorReporter, TracingReporter},
};
use socket2::SockRef;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, Interest, Ready};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Bytes written to every accepted stream before anything else.
///
/// Deployed clients match on the prefix `~SERVERCONNECTED\n\0`. The second
/// NUL is the terminator of the C string the greeting has always been sent
/// as; it stays so the byte count on the wire is unchanged.
pub const GREETING: &[u8] = b"~SERVERCONNECTED\n\0\0";

/// Outcome of a non-blocking send or receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// The OS accepted or delivered this many bytes
    Bytes(usize),
    /// Nothing could be transferred right now
    WouldBlock,
    /// The peer performed an orderly close (receive only)
    PeerClosed,
}

/// Central owner of the server's network resources.
///
/// # Architecture
///
/// * Stream and datagram listeners, each unset until initialized
/// * A [`SessionRegistry`] keyed by socket handle
/// * An injected [`ErrorReporter`] for fatal and recoverable failures
/// * Readiness comes from the tokio reactor, so the number of sessions is
///   not bounded by a descriptor-set capacity
pub struct NetworkManager {
    config: NetworkConfig,
    reporter: Arc<dyn ErrorReporter>,
    stream: Option<StreamListener>,
    datagram: Option<DatagramListener>,
    sessions: SessionRegistry,
}

impl NetworkManager {
    /// Creates a manager with no open sockets.
    pub fn new(config: NetworkConfig, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            config,
            reporter,
            stream: None,
            datagram: None,
            sessions: SessionRegistry::new(),
        }
    }

    /// Creates a manager that reports failures through `tracing`.
    pub fn with_tracing(config: NetworkConfig) -> Self {
        Self::new(config, Arc::new(TracingReporter))
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Brings up the stream listener.
    ///
    /// Resolves the bind address, then creates, binds and configures the
    /// socket. Any failure goes to the fatal channel and leaves the stream
    /// transport uninitialized, so accept is never attempted on it.
    ///
    /// # Returns
    ///
    /// The address the listener is bound to.
    pub fn init_stream_listener(&mut self) -> Result<SocketAddr, NetworkError> {
        if let Some(listener) = &self.stream {
            warn!("Stream listener already initialized on {}", listener.local_addr());
            return Ok(listener.local_addr());
        }

        let bound = resolve_bind_address(&self.config.bind_host, self.config.tcp_port)
            .and_then(|addr| StreamListener::bind(addr, self.config.tcp_send_buffer_size));

        match bound {
            Ok(listener) => {
                let addr = listener.local_addr();
                info!(
                    "🌐 TCP listener ready on {} (socket {}, send buffer {} bytes)",
                    addr,
                    listener.handle(),
                    self.config.tcp_send_buffer_size
                );
                self.stream = Some(listener);
                Ok(addr)
            }
            Err(e) => {
                self.reporter.fatal(&e);
                Err(e)
            }
        }
    }

    /// Brings up the datagram socket. Failures are fatal as for the stream
    /// listener.
    pub fn init_datagram_listener(&mut self) -> Result<SocketAddr, NetworkError> {
        if let Some(listener) = &self.datagram {
            warn!("Datagram socket already initialized on {}", listener.local_addr());
            return Ok(listener.local_addr());
        }

        let bound = resolve_bind_address(&self.config.bind_host, self.config.udp_port)
            .and_then(DatagramListener::bind);

        match bound {
            Ok(listener) => {
                let addr = listener.local_addr();
                info!("📡 UDP socket ready on {} (socket {})", addr, listener.handle());
                self.datagram = Some(listener);
                Ok(addr)
            }
            Err(e) => {
                self.reporter.fatal(&e);
                Err(e)
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_datagram_bound(&self) -> bool {
        self.datagram.is_some()
    }

    pub fn stream_local_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().map(StreamListener::local_addr)
    }

    pub fn datagram_local_addr(&self) -> Option<SocketAddr> {
        self.datagram.as_ref().map(DatagramListener::local_addr)
    }

    /// Waits for a pending connection and turns it into a session.
    ///
    /// On success the new socket has keep-alive enabled, the session is
    /// registered under `id` and the [`GREETING`] has been written to it.
    /// Returns `None` when the listener is not initialized, when `id` is
    /// already taken, or when accept fails; the last two are reported on the
    /// error channel and the listener keeps accepting.
    pub async fn accept(&mut self, id: SessionId) -> Option<&Session> {
        let listener = self.admission_listener(id)?;
        let accepted = listener.accept().await;
        self.finish_accept(id, accepted).await
    }

    /// Accepts a connection only if one is already pending in the kernel.
    ///
    /// "Nothing pending" returns `None` and is not an error. Only the
    /// greeting write may wait.
    pub async fn try_accept(&mut self, id: SessionId) -> Option<&Session> {
        let listener = self.admission_listener(id)?;
        let accepted = listener.try_accept().transpose()?;
        self.finish_accept(id, accepted).await
    }

    fn admission_listener(&self, id: SessionId) -> Option<&StreamListener> {
        let Some(listener) = self.stream.as_ref() else {
            debug!("Accept skipped: stream listener not initialized");
            return None;
        };
        if self.sessions.contains_id(id) {
            self.reporter.error(&NetworkError::DuplicateSession(id));
            return None;
        }
        Some(listener)
    }

    async fn finish_accept(
        &mut self,
        id: SessionId,
        accepted: io::Result<(TcpStream, SocketAddr)>,
    ) -> Option<&Session> {
        let (mut stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
            Err(e) => {
                self.reporter.error(&NetworkError::socket(SocketOp::Accept, e));
                return None;
            }
        };

        if let Err(e) = SockRef::from(&stream).set_keepalive(true) {
            warn!("Failed to enable keep-alive for {}: {}", peer, e);
        }

        if let Err(e) = stream.write_all(GREETING).await {
            let handle = SocketHandle::of(&stream);
            self.reporter.error(&NetworkError::io(handle, e));
            return None;
        }

        let session = Session::new(id, stream, peer);
        match self.sessions.insert(session) {
            Ok(session) => {
                info!(
                    "🔗 Session {} from {} (socket {})",
                    session.id(),
                    session.ip(),
                    session.handle()
                );
                Some(&*session)
            }
            Err(e) => {
                self.reporter.error(&e);
                None
            }
        }
    }

    /// Finds the session that owns `handle`. A miss is not an error.
    pub fn lookup(&self, handle: SocketHandle) -> Option<&Session> {
        self.sessions.get(handle)
    }

    pub fn lookup_mut(&mut self, handle: SocketHandle) -> Option<&mut Session> {
        self.sessions.get_mut(handle)
    }

    pub fn lookup_by_id(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get_by_id(id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of the registered handles, safe to iterate while removing.
    pub fn handles(&self) -> Vec<SocketHandle> {
        self.sessions.handles().collect()
    }

    /// Waits until the session's socket is ready for `interest`.
    pub async fn ready(&self, handle: SocketHandle, interest: Interest) -> Result<Ready, NetworkError> {
        let session = self.registered(handle)?;
        session
            .stream()
            .ready(interest)
            .await
            .map_err(|e| NetworkError::io(handle, e))
    }

    /// Writes as much of `buf` as the OS accepts right now.
    ///
    /// A partial count is normal; the caller retries or queues the rest.
    pub fn send(&self, handle: SocketHandle, buf: &[u8]) -> Result<Transfer, NetworkError> {
        let session = self.registered(handle)?;
        match session.write_now(buf) {
            Ok(n) => Ok(Transfer::Bytes(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Transfer::WouldBlock),
            Err(e) => Err(NetworkError::io(handle, e)),
        }
    }

    /// Reads whatever is available into `buf`.
    ///
    /// Zero bytes from the OS becomes [`Transfer::PeerClosed`].
    pub fn receive(&self, handle: SocketHandle, buf: &mut [u8]) -> Result<Transfer, NetworkError> {
        let session = self.registered(handle)?;
        if buf.is_empty() {
            return Ok(Transfer::Bytes(0));
        }
        match session.read_now(buf) {
            Ok(0) => Ok(Transfer::PeerClosed),
            Ok(n) => Ok(Transfer::Bytes(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Transfer::WouldBlock),
            Err(e) => Err(NetworkError::io(handle, e)),
        }
    }

    /// Waits until the datagram socket is ready for `interest`.
    pub async fn datagram_ready(&self, interest: Interest) -> Result<Ready, NetworkError> {
        let listener = self.datagram_listener()?;
        listener
            .socket()
            .ready(interest)
            .await
            .map_err(|e| NetworkError::io(listener.handle(), e))
    }

    /// Sends one datagram to `target` without waiting.
    pub fn send_datagram(&self, buf: &[u8], target: SocketAddr) -> Result<Transfer, NetworkError> {
        let listener = self.datagram_listener()?;
        match listener.try_send_to(buf, target) {
            Ok(n) => Ok(Transfer::Bytes(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Transfer::WouldBlock),
            Err(e) => Err(NetworkError::io(listener.handle(), e)),
        }
    }

    /// Receives one datagram if one is queued.
    ///
    /// # Returns
    ///
    /// The byte count and source address, or `None` when nothing is queued.
    /// Empty datagrams are valid and come back as `Some((0, addr))`.
    pub fn receive_datagram(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, NetworkError> {
        let listener = self.datagram_listener()?;
        match listener.try_recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(NetworkError::io(listener.handle(), e)),
        }
    }

    /// Unregisters a session and closes its socket.
    ///
    /// Returns `false` if no session is registered under `handle`; removing
    /// the same session twice is a no-op.
    pub fn remove(&mut self, handle: SocketHandle) -> bool {
        match self.sessions.remove(handle) {
            Some(session) => {
                info!(
                    "❌ Session {} from {} removed (socket {})",
                    session.id(),
                    session.ip(),
                    handle
                );
                true
            }
            None => {
                debug!("Socket {} has no registered session", handle);
                false
            }
        }
    }

    /// Closes both listeners and every remaining session.
    ///
    /// Safe to call more than once; later calls find nothing to close.
    pub fn shutdown(&mut self) {
        let released = self.sessions.drain().count();
        let stream_closed = self.stream.take().is_some();
        let datagram_closed = self.datagram.take().is_some();

        if released > 0 || stream_closed || datagram_closed {
            info!(
                "🧹 Network shut down: {} session(s) released, TCP listener {}, UDP socket {}",
                released,
                if stream_closed { "closed" } else { "not open" },
                if datagram_closed { "closed" } else { "not open" }
            );
        }
    }

    fn registered(&self, handle: SocketHandle) -> Result<&Session, NetworkError> {
        self.sessions
            .get(handle)
            .ok_or(NetworkError::UnknownHandle(handle))
    }

    fn datagram_listener(&self) -> Result<&DatagramListener, NetworkError> {
        self.datagram
            .as_ref()
            .ok_or(NetworkError::NotListening("datagram"))
    }
}

impl Drop for NetworkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
