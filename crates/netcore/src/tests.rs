#![cfg(test)]
//! Loopback tests covering the manager end to end.

use crate::*;
use socket2::SockRef;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

/// Connected pair over loopback: (server side, client side, client address).
pub(crate) async fn loopback_pair() -> (TcpStream, TcpStream, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
    let (server_side, peer) = listener.accept().await.unwrap();
    (server_side, client, peer)
}

#[derive(Default)]
struct RecordingReporter {
    fatal: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn fatal_count(&self) -> usize {
        self.fatal.lock().unwrap().len()
    }

    fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

impl ErrorReporter for RecordingReporter {
    fn fatal(&self, error: &NetworkError) {
        self.fatal.lock().unwrap().push(error.to_string());
    }

    fn error(&self, error: &NetworkError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

fn manager_with(config: NetworkConfig) -> (NetworkManager, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    (NetworkManager::new(config, reporter.clone()), reporter)
}

async fn read_greeting(client: &mut TcpStream) -> Vec<u8> {
    let mut greeting = vec![0u8; GREETING.len()];
    client.read_exact(&mut greeting).await.unwrap();
    greeting
}

#[tokio::test]
async fn test_end_to_end_greeting_and_ping() {
    let (mut manager, reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().expect("stream listener");

    let mut client = TcpStream::connect(addr).await.unwrap();
    let session = manager.accept(7).await.expect("session accepted");
    assert_eq!(session.id(), 7);
    assert_eq!(session.seq(), 0);
    assert_eq!(session.ip(), "127.0.0.1");
    assert!(SockRef::from(session.stream()).keepalive().unwrap());
    let handle = session.handle();

    let greeting = read_greeting(&mut client).await;
    assert!(greeting.starts_with(b"~SERVERCONNECTED\n\0"));
    assert_eq!(greeting, GREETING);

    client.write_all(b"ping").await.unwrap();
    // Let loopback deliver without turning the reactor
    std::thread::sleep(Duration::from_millis(20));
    let mut buf = [0u8; 64];
    assert_eq!(manager.receive(handle, &mut buf).unwrap(), Transfer::Bytes(4));
    assert_eq!(&buf[..4], b"ping");

    assert!(manager.remove(handle));
    assert!(manager.lookup(handle).is_none());
    assert_eq!(reporter.fatal_count(), 0);
    assert_eq!(reporter.error_count(), 0);
}

#[tokio::test]
async fn test_unavailable_port_is_fatal_and_blocks_accept() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let config = NetworkConfig {
        tcp_port: occupied.local_addr().unwrap().port(),
        ..NetworkConfig::loopback()
    };
    let (mut manager, reporter) = manager_with(config);

    let err = manager.init_stream_listener().unwrap_err();
    assert_eq!(err.operation(), Some(SocketOp::Bind));
    assert_eq!(reporter.fatal_count(), 1);
    assert!(!manager.is_listening());
    assert!(manager.stream_local_addr().is_none());

    // Nothing to accept on, so both forms return immediately
    assert!(manager.accept(1).await.is_none());
    assert!(manager.try_accept(1).await.is_none());
    assert_eq!(reporter.error_count(), 0);
}

#[tokio::test]
async fn test_unavailable_datagram_port_is_fatal() {
    let occupied = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let config = NetworkConfig {
        udp_port: occupied.local_addr().unwrap().port(),
        ..NetworkConfig::loopback()
    };
    let (mut manager, reporter) = manager_with(config);

    let err = manager.init_datagram_listener().unwrap_err();
    assert_eq!(err.operation(), Some(SocketOp::Bind));
    assert_eq!(reporter.fatal_count(), 1);
    assert_eq!(reporter.error_count(), 0);
    assert!(!manager.is_datagram_bound());
    assert!(manager.datagram_local_addr().is_none());

    let mut buf = [0u8; 8];
    assert!(matches!(
        manager.receive_datagram(&mut buf),
        Err(NetworkError::NotListening("datagram"))
    ));
}

#[tokio::test]
async fn test_accepted_sockets_have_keepalive() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();
    let _a = TcpStream::connect(addr).await.unwrap();
    let _b = TcpStream::connect(addr).await.unwrap();

    for id in 1..=2 {
        let session = manager.accept(id).await.unwrap();
        assert!(SockRef::from(session.stream()).keepalive().unwrap());
    }
}

#[tokio::test]
async fn test_accept_many_sessions() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();

    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(TcpStream::connect(addr).await.unwrap());
    }

    let mut handles = Vec::new();
    for id in 1..=5 {
        let session = manager.accept(id).await.expect("accepted");
        handles.push((id, session.handle()));
    }

    assert_eq!(manager.session_count(), 5);
    let mut distinct: Vec<_> = handles.iter().map(|(_, h)| *h).collect();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 5);

    for (id, handle) in &handles {
        let session = manager.lookup(*handle).expect("registered");
        assert_eq!(session.id(), *id);
        assert_eq!(session.handle(), *handle);
        assert_eq!(manager.lookup_by_id(*id).map(Session::handle), Some(*handle));
    }
}

#[tokio::test]
async fn test_double_removal_is_harmless() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();
    let _a = TcpStream::connect(addr).await.unwrap();
    let _b = TcpStream::connect(addr).await.unwrap();

    let first = manager.accept(1).await.unwrap().handle();
    let second = manager.accept(2).await.unwrap().handle();

    assert!(manager.remove(first));
    assert!(!manager.remove(first));

    assert!(manager.lookup(first).is_none());
    assert_eq!(manager.lookup(second).map(Session::id), Some(2));
    assert_eq!(manager.session_count(), 1);
    assert_eq!(manager.handles(), vec![second]);
}

#[tokio::test]
async fn test_orderly_close_reads_as_peer_closed() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();
    let mut client = TcpStream::connect(addr).await.unwrap();
    let handle = manager.accept(1).await.unwrap().handle();

    // Drain the greeting so closing sends FIN rather than RST
    read_greeting(&mut client).await;
    drop(client);

    manager.ready(handle, Interest::READABLE).await.unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(manager.receive(handle, &mut buf).unwrap(), Transfer::PeerClosed);
}

#[tokio::test]
async fn test_oversized_send_is_partial() {
    let config = NetworkConfig {
        tcp_send_buffer_size: 16 * 1024,
        ..NetworkConfig::loopback()
    };
    let (mut manager, _reporter) = manager_with(config);
    let addr = manager.init_stream_listener().unwrap();
    let _client = TcpStream::connect(addr).await.unwrap();
    let handle = manager.accept(1).await.unwrap().handle();

    let payload = vec![0x5a_u8; 32 * 1024 * 1024];
    manager.ready(handle, Interest::WRITABLE).await.unwrap();
    match manager.send(handle, &payload).unwrap() {
        Transfer::Bytes(n) => assert!(n > 0 && n < payload.len(), "sent {n} bytes"),
        other => panic!("expected a partial send, got {other:?}"),
    }
}

#[tokio::test]
async fn test_receive_with_nothing_queued_would_block() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();
    let _client = TcpStream::connect(addr).await.unwrap();
    let handle = manager.accept(1).await.unwrap().handle();

    let mut buf = [0u8; 16];
    assert_eq!(manager.receive(handle, &mut buf).unwrap(), Transfer::WouldBlock);
}

#[tokio::test]
async fn test_send_reaches_client() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();
    let mut client = TcpStream::connect(addr).await.unwrap();
    let handle = manager.accept(3).await.unwrap().handle();
    read_greeting(&mut client).await;

    manager.ready(handle, Interest::WRITABLE).await.unwrap();
    assert_eq!(manager.send(handle, b"pong").unwrap(), Transfer::Bytes(4));

    let mut buf = [0u8; 4];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"pong");
}

#[tokio::test]
async fn test_unknown_handle_is_an_error() {
    let (manager, _reporter) = manager_with(NetworkConfig::loopback());
    let stranger = SocketHandle::from_raw(u64::MAX);
    let mut buf = [0u8; 4];

    assert!(manager.lookup(stranger).is_none());
    assert!(matches!(
        manager.send(stranger, b"x"),
        Err(NetworkError::UnknownHandle(h)) if h == stranger
    ));
    assert!(matches!(
        manager.receive(stranger, &mut buf),
        Err(NetworkError::UnknownHandle(_))
    ));
}

#[tokio::test]
async fn test_duplicate_id_leaves_connection_pending() {
    let (mut manager, reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();
    let _first = TcpStream::connect(addr).await.unwrap();
    manager.accept(1).await.unwrap();

    let _second = TcpStream::connect(addr).await.unwrap();
    assert!(manager.accept(1).await.is_none());
    assert_eq!(reporter.error_count(), 1);

    let session = manager.accept(2).await.expect("pending connection still there");
    assert_eq!(session.id(), 2);
    assert_eq!(manager.session_count(), 2);
}

#[tokio::test]
async fn test_try_accept() {
    let (mut manager, reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();

    assert!(manager.try_accept(1).await.is_none());

    // The handshake completes in the kernel; the reactor has not run since
    let client = std::net::TcpStream::connect(addr).unwrap();
    std::thread::sleep(Duration::from_millis(20));

    let handle = manager
        .try_accept(1)
        .await
        .expect("queued connection accepted on the first call")
        .handle();
    assert_eq!(manager.lookup(handle).map(Session::id), Some(1));
    assert!(manager.try_accept(2).await.is_none());

    client.set_nonblocking(true).unwrap();
    let mut client = TcpStream::from_std(client).unwrap();
    assert_eq!(read_greeting(&mut client).await, GREETING);
    assert_eq!(reporter.error_count(), 0);
}

#[tokio::test]
async fn test_session_ip_can_be_overridden() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();
    let _client = TcpStream::connect(addr).await.unwrap();
    let handle = manager.accept(1).await.unwrap().handle();

    let session = manager.lookup_mut(handle).unwrap();
    session.set_ip("198.51.100.20");
    session.reset_seq();
    assert_eq!(manager.lookup(handle).unwrap().ip(), "198.51.100.20");
}

#[tokio::test]
async fn test_datagram_round_trip() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_datagram_listener().expect("datagram socket");
    assert!(manager.is_datagram_bound());

    let mut buf = [0u8; 64];
    assert_eq!(manager.receive_datagram(&mut buf).unwrap(), None);

    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    peer.send_to(b"hello", addr).await.unwrap();
    std::thread::sleep(Duration::from_millis(20));

    let (n, from) = manager
        .receive_datagram(&mut buf)
        .unwrap()
        .expect("datagram queued");
    assert_eq!(&buf[..n], b"hello");
    assert_eq!(from, peer.local_addr().unwrap());

    manager.datagram_ready(Interest::WRITABLE).await.unwrap();
    assert_eq!(manager.send_datagram(b"world", from).unwrap(), Transfer::Bytes(5));
    let (n, _) = peer.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"world");
}

#[tokio::test]
async fn test_datagram_ops_require_init() {
    let (manager, _reporter) = manager_with(NetworkConfig::loopback());
    let mut buf = [0u8; 8];
    let target: SocketAddr = "127.0.0.1:9".parse().unwrap();

    assert!(matches!(
        manager.receive_datagram(&mut buf),
        Err(NetworkError::NotListening("datagram"))
    ));
    assert!(matches!(
        manager.send_datagram(b"x", target),
        Err(NetworkError::NotListening(_))
    ));
}

#[tokio::test]
async fn test_shutdown_closes_everything_and_is_idempotent() {
    let (mut manager, _reporter) = manager_with(NetworkConfig::loopback());
    let addr = manager.init_stream_listener().unwrap();
    manager.init_datagram_listener().unwrap();

    let mut client = TcpStream::connect(addr).await.unwrap();
    manager.accept(1).await.unwrap();
    read_greeting(&mut client).await;

    manager.shutdown();
    assert_eq!(manager.session_count(), 0);
    assert!(!manager.is_listening());
    assert!(!manager.is_datagram_bound());

    // The session socket is closed, so the client sees end of stream
    let mut buf = [0u8; 1];
    assert_eq!(client.read(&mut buf).await.unwrap(), 0);

    manager.shutdown();
    assert!(manager.accept(2).await.is_none());
}

#[tokio::test]
async fn test_reinit_keeps_existing_listener() {
    let (mut manager, reporter) = manager_with(NetworkConfig::loopback());
    let first = manager.init_stream_listener().unwrap();
    let second = manager.init_stream_listener().unwrap();
    assert_eq!(first, second);
    assert_eq!(reporter.fatal_count(), 0);
}
