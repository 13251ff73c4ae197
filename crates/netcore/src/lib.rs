//! # netcore - Game Server Connection Layer
//!
//! The network foundation of the game server process. This crate owns the
//! listening sockets for both transports, accepts and tracks client sessions,
//! and provides the raw send/receive primitives everything above it builds
//! on. It contains **no protocol logic**: bytes go in and out unmodified.
//!
//! ## Architecture Overview
//!
//! * **Session** - Per-client state: id, owned socket, peer address, sequence counter
//! * **Session Registry** - Live sessions indexed by socket handle and by id
//! * **Stream Listener** - Non-blocking TCP listener with tuned send buffer
//! * **Datagram Listener** - The single non-blocking UDP socket shared by all peers
//! * **Network Manager** - Composes the above for the server's event loop
//!
//! ### Event Loop Contract
//!
//! 1. Initialize both listeners; a fatal report means startup must stop
//! 2. Accept connections with caller-assigned session ids
//! 3. Wait for readiness, then send/receive without blocking
//! 4. Remove sessions whose peer closed or errored
//! 5. Shut down once, closing every socket
//!
//! ```rust,no_run
//! use netcore::{NetworkConfig, NetworkManager, Transfer};
//! use tokio::io::Interest;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), netcore::NetworkError> {
//! let mut manager = NetworkManager::with_tracing(NetworkConfig::default());
//! manager.init_stream_listener()?;
//! manager.init_datagram_listener()?;
//!
//! let handle = match manager.accept(1).await {
//!     Some(session) => session.handle(),
//!     None => return Ok(()),
//! };
//!
//! let mut buf = [0u8; 4096];
//! manager.ready(handle, Interest::READABLE).await?;
//! if let Transfer::PeerClosed = manager.receive(handle, &mut buf)? {
//!     manager.remove(handle);
//! }
//! manager.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Failures are resolved where they happen and returned as [`NetworkError`]
//! values. Listener initialization failures also go to the fatal channel of
//! the injected [`ErrorReporter`]; accept failures go to its error channel.
//! "Would block", "nothing pending" and lookup misses are ordinary results.
//!
//! ## Thread Safety
//!
//! The manager is a single owner without internal locking. Every mutating
//! operation takes `&mut self`; share it across tasks only behind a lock or
//! by giving one task exclusive ownership.

pub use config::NetworkConfig;
pub use connection::{Session, SessionId, SessionRegistry, SocketHandle};
pub use error::{NetworkError, SocketOp};
pub use manager::{NetworkManager, Transfer, GREETING};
pub use reporter::{ErrorReporter, TracingReporter};
pub use tokio::io::{Interest, Ready};

pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod manager;
pub mod reporter;

mod tests;
