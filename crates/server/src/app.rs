//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that brings up the
//! network listeners, drives the poll loop, and tears everything down on
//! shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    poller::NetworkPoller,
    signals::{spawn_forced_exit_handler, wait_for_shutdown_signal},
};
use netcore::NetworkManager;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Main application struct.
///
/// The `Application` owns the merged configuration and the network manager
/// for the lifetime of the process.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Listeners and live sessions
    manager: NetworkManager,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Create the network manager (listeners are opened in [`run`](Self::run))
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(bind_host) = args.bind_host {
            config.server.bind_host = bind_host;
        }

        if let Some(tcp_port) = args.tcp_port {
            config.server.tcp_port = tcp_port;
        }

        if let Some(udp_port) = args.udp_port {
            config.server.udp_port = udp_port;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let manager = NetworkManager::with_tracing(config.to_network_config());
        Ok(Self { config, manager })
    }

    /// Runs until SIGINT/SIGTERM, then shuts down gracefully.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(async {
            wait_for_shutdown_signal().await?;
            spawn_forced_exit_handler();
            Ok::<(), std::io::Error>(())
        })
        .await
    }

    /// Opens both listeners and polls the network until `shutdown` resolves.
    ///
    /// Listener failures are fatal and returned before the loop starts.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        info!("🌟 Starting game server");
        self.log_configuration_summary();

        let tcp_addr = self.manager.init_stream_listener()?;
        let udp_addr = self.manager.init_datagram_listener()?;

        let mut poller = NetworkPoller::new();

        let mut tick = interval(Duration::from_millis(self.config.server.tick_interval_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let health_period = Duration::from_secs(self.config.server.health_interval_secs);
        let mut health = interval_at(Instant::now() + health_period, health_period);

        info!("✅ Server is now running!");
        info!("🎮 Accepting TCP sessions on {} and datagrams on {}", tcp_addr, udp_addr);
        info!(
            "🔍 Health monitoring active - stats every {} seconds",
            self.config.server.health_interval_secs
        );
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::pin!(shutdown);
        let mut last_bytes = 0u64;

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    break;
                }
                _ = tick.tick() => {
                    poller.poll(&mut self.manager).await;
                }
                _ = health.tick() => {
                    let stats = poller.stats();
                    info!(
                        "📊 System Health - {} session(s) | {} accepted | {} bytes this period",
                        self.manager.session_count(),
                        stats.accepted,
                        stats.bytes_received - last_bytes
                    );
                    last_bytes = stats.bytes_received;
                }
            }
        }

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        info!("🔌 Closing {} session(s) and both listeners", self.manager.session_count());
        self.manager.shutdown();

        poller.stats().log_final();
        info!("✅ Game server shutdown complete");

        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        let server = &self.config.server;
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind host: {}", server.bind_host);
        info!("  🔗 TCP port: {} | UDP port: {}", server.tcp_port, server.udp_port);
        info!("  📦 TCP send buffer: {} bytes", server.tcp_send_buffer_size);
        info!("  ⏱️ Poll interval: {}ms", server.tick_interval_ms);
    }
}
