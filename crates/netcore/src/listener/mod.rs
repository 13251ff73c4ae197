//! Listening sockets for both transports.
//!
//! Sockets are built with `socket2` so every option the server relies on
//! (non-blocking mode, backlog, send buffer size) is applied before the
//! socket is handed to the tokio reactor for readiness tracking.

pub mod datagram;
pub mod stream;

pub use datagram::DatagramListener;
pub use stream::StreamListener;

use crate::error::{NetworkError, SocketOp};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Resolves the address a listener binds to.
///
/// IPv4 results are preferred when the host resolves to several addresses.
pub fn resolve_bind_address(host: &str, port: u16) -> Result<SocketAddr, NetworkError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::socket(SocketOp::Resolve, e))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            NetworkError::socket(
                SocketOp::Resolve,
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {host}:{port}"),
                ),
            )
        })
}
