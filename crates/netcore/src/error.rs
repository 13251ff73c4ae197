//! Error types for the network layer.
//!
//! Every socket-level failure is resolved at the call that produced it and
//! surfaced as a [`NetworkError`]. Initialization failures are fatal for the
//! transport, accept failures are recoverable, and "would block" or lookup
//! misses are never errors at all.

use crate::connection::{SessionId, SocketHandle};
use std::fmt;
use std::io;

/// The socket operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOp {
    Resolve,
    Create,
    NonBlocking,
    ReuseAddress,
    Bind,
    Listen,
    SendBufferSize,
    Register,
    Accept,
    LocalAddress,
}

impl fmt::Display for SocketOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocketOp::Resolve => "getaddrinfo",
            SocketOp::Create => "socket",
            SocketOp::NonBlocking => "set_nonblocking",
            SocketOp::ReuseAddress => "set_reuse_address",
            SocketOp::Bind => "bind",
            SocketOp::Listen => "listen",
            SocketOp::SendBufferSize => "setsockopt(SO_SNDBUF)",
            SocketOp::Register => "register",
            SocketOp::Accept => "accept",
            SocketOp::LocalAddress => "getsockname",
        };
        f.write_str(name)
    }
}

/// Enumeration of network layer errors.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// A socket call failed; carries the platform error code and message
    #[error("{op}() failed with error {code}: {source}")]
    Socket {
        op: SocketOp,
        code: i32,
        #[source]
        source: io::Error,
    },

    /// The caller supplied a session id that is already in use
    #[error("session id {0} is already registered")]
    DuplicateSession(SessionId),

    /// A live session already owns the handle
    #[error("socket {0} is already owned by a live session")]
    HandleInUse(SocketHandle),

    /// No session is registered for the handle
    #[error("no session registered for socket {0}")]
    UnknownHandle(SocketHandle),

    /// The listener for the transport has not been initialized
    #[error("{0} listener is not initialized")]
    NotListening(&'static str),

    /// An I/O failure on a registered session or the datagram socket
    #[error("I/O error on socket {handle}: {source}")]
    Io {
        handle: SocketHandle,
        #[source]
        source: io::Error,
    },
}

impl NetworkError {
    pub(crate) fn socket(op: SocketOp, source: io::Error) -> Self {
        NetworkError::Socket {
            op,
            code: platform_code(&source),
            source,
        }
    }

    pub(crate) fn io(handle: SocketHandle, source: io::Error) -> Self {
        NetworkError::Io { handle, source }
    }

    /// Returns the platform error code when the error came from the OS.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            NetworkError::Socket { source, .. } | NetworkError::Io { source, .. } => {
                source.raw_os_error()
            }
            _ => None,
        }
    }

    /// Returns the failed socket operation, if any.
    pub fn operation(&self) -> Option<SocketOp> {
        match self {
            NetworkError::Socket { op, .. } => Some(*op),
            _ => None,
        }
    }
}

/// Errors that did not originate in a syscall report `-1`.
fn platform_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(-1)
}
