//! One pass of the server's network event loop.
//!
//! Each tick accepts whatever connections are pending, drains readable
//! sessions and datagrams, and removes sessions whose peer went away.
//! Packet parsing lives above this layer, so received bytes are only
//! counted here.

use netcore::{NetworkManager, SessionId, Transfer};
use tracing::{debug, info, warn};

/// Upper bound on reads per session (and datagrams) in one tick so a
/// single busy peer cannot starve the rest.
const MAX_READS_PER_TICK: usize = 16;

/// Receive buffer size; large enough for any UDP datagram
const RECEIVE_BUFFER_SIZE: usize = 64 * 1024;

/// Running totals reported at health checks and shutdown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub accepted: u64,
    pub closed: u64,
    pub bytes_received: u64,
    pub datagrams_received: u64,
}

/// Drives a [`NetworkManager`] from the server tick.
#[derive(Debug)]
pub struct NetworkPoller {
    next_id: SessionId,
    buffer: Vec<u8>,
    stats: PollStats,
}

impl Default for NetworkPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkPoller {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            buffer: vec![0; RECEIVE_BUFFER_SIZE],
            stats: PollStats::default(),
        }
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// Runs one pass over the network. Never waits for I/O beyond writing
    /// the greeting to newly accepted sessions.
    pub async fn poll(&mut self, manager: &mut NetworkManager) {
        self.accept_pending(manager).await;
        self.drain_sessions(manager);
        self.drain_datagrams(manager);
    }

    async fn accept_pending(&mut self, manager: &mut NetworkManager) {
        loop {
            // Skip ids still held by long-lived sessions after wrap-around
            while manager.lookup_by_id(self.next_id).is_some() {
                self.next_id = self.next_id.wrapping_add(1);
            }

            let Some(session) = manager.try_accept(self.next_id).await else {
                break;
            };
            debug!("Accepted session {} on socket {}", session.id(), session.handle());
            self.next_id = self.next_id.wrapping_add(1);
            self.stats.accepted += 1;
        }
    }

    fn drain_sessions(&mut self, manager: &mut NetworkManager) {
        for handle in manager.handles() {
            for _ in 0..MAX_READS_PER_TICK {
                match manager.receive(handle, &mut self.buffer) {
                    Ok(Transfer::Bytes(n)) => {
                        debug!("📥 {} bytes from socket {}", n, handle);
                        self.stats.bytes_received += n as u64;
                    }
                    Ok(Transfer::WouldBlock) => break,
                    Ok(Transfer::PeerClosed) => {
                        if manager.remove(handle) {
                            self.stats.closed += 1;
                        }
                        break;
                    }
                    Err(e) => {
                        warn!("Dropping session on socket {}: {}", handle, e);
                        if manager.remove(handle) {
                            self.stats.closed += 1;
                        }
                        break;
                    }
                }
            }
        }
    }

    fn drain_datagrams(&mut self, manager: &NetworkManager) {
        if !manager.is_datagram_bound() {
            return;
        }

        for _ in 0..MAX_READS_PER_TICK {
            match manager.receive_datagram(&mut self.buffer) {
                Ok(Some((n, from))) => {
                    debug!("📥 {} byte datagram from {}", n, from);
                    self.stats.datagrams_received += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Datagram receive failed: {}", e);
                    break;
                }
            }
        }
    }
}

impl PollStats {
    pub fn log_final(&self) {
        info!("📊 Final Statistics:");
        info!("  - Sessions accepted: {}", self.accepted);
        info!("  - Sessions closed by peers: {}", self.closed);
        info!("  - Stream bytes received: {}", self.bytes_received);
        info!("  - Datagrams received: {}", self.datagrams_received);
    }
}
