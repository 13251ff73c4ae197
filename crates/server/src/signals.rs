//! Signal handling for graceful server shutdown.
//!
//! The first termination signal starts a graceful shutdown; a second one
//! while shutdown is in progress exits immediately.

use tokio::signal;
use tracing::{error, info, warn};

/// Waits for a termination signal.
///
/// # Platform Support
///
/// * **Unix platforms**: Handles SIGINT and SIGTERM signals
/// * **Windows**: Handles Ctrl+C signal
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    wait_for_signal().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

/// Spawns a task that exits the process on the next termination signal.
pub fn spawn_forced_exit_handler() {
    tokio::spawn(async {
        if let Err(e) = wait_for_signal().await {
            error!("Failed to set up forced shutdown signal handler: {e}");
            return;
        }

        warn!("Shutdown signal received again! Exiting immediately.");
        std::process::exit(1);
    });
}

async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
