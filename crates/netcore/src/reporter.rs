//! Error reporting channel injected into the network manager.
//!
//! The manager never decides how failures are presented. Fatal reports mean a
//! transport could not be brought up; error reports are recoverable and the
//! server keeps running.

use crate::error::NetworkError;
use tracing::error;

/// Sink for failures the network manager resolves locally.
pub trait ErrorReporter: Send + Sync {
    /// A listener could not be initialized; startup must not continue.
    fn fatal(&self, error: &NetworkError);

    /// A recoverable failure such as a failed accept.
    fn error(&self, error: &NetworkError);
}

/// Default reporter that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn fatal(&self, err: &NetworkError) {
        error!(fatal = true, code = ?err.os_code(), "💥 {}", err);
    }

    fn error(&self, err: &NetworkError) {
        error!(code = ?err.os_code(), "❌ {}", err);
    }
}
