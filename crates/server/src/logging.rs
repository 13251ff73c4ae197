//! Logging system setup and configuration.
//!
//! This module handles the initialization of the tracing-based logging
//! system with human-readable or JSON console output and an optional
//! plain-text log file.

use crate::config::LoggingSettings;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system with the specified configuration.
///
/// # Arguments
///
/// * `config` - Logging configuration from the config file
/// * `json_format` - Whether to force JSON output format (CLI override)
///
/// # Features
///
/// * **Environment variable support** - Respects `RUST_LOG` if set
/// * **Flexible formatting** - Human-readable or JSON output
/// * **Log file** - Appends an uncolored copy to `file_path` when set
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_layer = match &config.file_path {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_thread_ids(true)
                .with_writer(Mutex::new(open_log_file(Path::new(path))?)),
        ),
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if json_format || config.json_format {
        registry
            .with(fmt::layer()
                .json()
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(true)
                .with_thread_names(true)
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer()
                .with_ansi(true)
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(true)
                .with_thread_names(true)
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    if let Some(path) = &config.file_path {
        info!("📝 Writing log file to {}", path);
    }
    Ok(())
}

/// Opens the log file for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Displays the startup banner.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║             🎮 GAME SERVER 🎮            ║");
    info!("║                  v{}                  ║", version);
    info!("║                                          ║");
    info!("║  🌐 TCP sessions + UDP datagrams         ║");
    info!("║  ⚡ Non-blocking socket core             ║");
    info!("╚══════════════════════════════════════════╝");
}
