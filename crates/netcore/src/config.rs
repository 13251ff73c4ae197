//! Network configuration types and defaults.
//!
//! The configuration subsystem hands the [`NetworkManager`](crate::NetworkManager)
//! a [`NetworkConfig`] at construction; nothing in this crate reads global
//! configuration state.

use serde::{Deserialize, Serialize};

/// Default TCP listen port
pub const DEFAULT_TCP_PORT: u16 = 30002;

/// Default UDP listen port
pub const DEFAULT_UDP_PORT: u16 = 30003;

/// Default SO_SNDBUF for the stream listener (inherited by accepted sockets)
pub const DEFAULT_TCP_SEND_BUFFER_SIZE: usize = 128 * 1024;

/// Configuration for both listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host the listeners bind to; `0.0.0.0` is the wildcard address
    pub bind_host: String,

    /// TCP listen port (0 picks an ephemeral port)
    pub tcp_port: u16,

    /// UDP listen port (0 picks an ephemeral port)
    pub udp_port: u16,

    /// Send buffer size in bytes applied to the stream listener
    pub tcp_send_buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            tcp_port: DEFAULT_TCP_PORT,
            udp_port: DEFAULT_UDP_PORT,
            tcp_send_buffer_size: DEFAULT_TCP_SEND_BUFFER_SIZE,
        }
    }
}

impl NetworkConfig {
    /// Loopback configuration with ephemeral ports, for tests and tools.
    pub fn loopback() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            tcp_port: 0,
            udp_port: 0,
            ..Default::default()
        }
    }
}
