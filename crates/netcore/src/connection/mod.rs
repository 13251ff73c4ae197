//! Session tracking for accepted stream connections.
//!
//! This module defines the per-client [`Session`], the [`SessionRegistry`]
//! that owns every live session, and the [`SocketHandle`] they are keyed by.

pub mod registry;
pub mod session;

pub use registry::SessionRegistry;
pub use session::Session;

use std::fmt;

/// Type alias for session identifiers.
///
/// Ids are assigned by the caller of accept and stay stable for the whole
/// lifetime of the session.
pub type SessionId = u32;

/// The OS-level descriptor of a socket.
///
/// A handle is only meaningful while the socket it was taken from is open;
/// the OS may hand the same value to a later socket once it is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(u64);

impl SocketHandle {
    /// Wraps a raw descriptor value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw descriptor value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[cfg(unix)]
    pub(crate) fn of<S: std::os::fd::AsRawFd>(socket: &S) -> Self {
        Self(socket.as_raw_fd() as u64)
    }

    #[cfg(windows)]
    pub(crate) fn of<S: std::os::windows::io::AsRawSocket>(socket: &S) -> Self {
        Self(socket.as_raw_socket())
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
