//! UDP socket setup. There is no accept step: every peer shares this socket
//! and is told apart by its source address.

use crate::connection::SocketHandle;
use crate::error::{NetworkError, SocketOp};
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io::{self, Read};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::trace;

#[derive(Debug)]
pub struct DatagramListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl DatagramListener {
    /// Creates a non-blocking datagram socket bound to `addr`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(addr: SocketAddr) -> Result<Self, NetworkError> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| NetworkError::socket(SocketOp::Create, e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| NetworkError::socket(SocketOp::NonBlocking, e))?;

        socket
            .bind(&addr.into())
            .map_err(|e| NetworkError::socket(SocketOp::Bind, e))?;

        let socket = UdpSocket::from_std(socket.into())
            .map_err(|e| NetworkError::socket(SocketOp::Register, e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| NetworkError::socket(SocketOp::LocalAddress, e))?;

        trace!("✅ Datagram socket bound on {}", local_addr);
        Ok(Self { socket, local_addr })
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Receives one datagram if one is queued, without waiting.
    ///
    /// Falls back to the raw socket when tokio's reactor has not yet seen
    /// it become readable.
    pub fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        match self.socket.try_recv_from(buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                let socket = SockRef::from(&self.socket);
                let from = socket.peek_sender()?.as_socket().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "sender is not an IP address")
                })?;
                let mut raw: &Socket = &socket;
                let n = raw.read(buf)?;
                Ok((n, from))
            }
            other => other,
        }
    }

    /// Sends one datagram without waiting.
    pub fn try_send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        match self.socket.try_send_to(buf, target) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                SockRef::from(&self.socket).send_to(buf, &target.into())
            }
            other => other,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> SocketHandle {
        SocketHandle::of(&self.socket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_receive() {
        let listener = DatagramListener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        peer.send_to(b"hi", listener.local_addr()).await.unwrap();

        let mut buf = [0u8; 8];
        let (n, from) = listener.socket().recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hi");
        assert_eq!(from, peer.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_try_recv_from_without_reactor_turn() {
        let listener = DatagramListener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(
            listener.try_recv_from(&mut buf).unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );

        let peer = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.send_to(b"yo", listener.local_addr()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));

        let (n, from) = listener.try_recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"yo");
        assert_eq!(from, peer.local_addr().unwrap());

        assert_eq!(listener.try_send_to(b"back", from).unwrap(), 4);
        let (n, _) = peer.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"back");
    }

    #[tokio::test]
    async fn test_bind_port_in_use_fails() {
        let occupied = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let err = DatagramListener::bind(occupied.local_addr().unwrap()).unwrap_err();
        assert_eq!(err.operation(), Some(SocketOp::Bind));
    }
}
