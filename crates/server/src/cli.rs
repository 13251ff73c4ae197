//! Command-line interface handling for the server.
//!
//! Uses the `clap` builder API; every flag except `--config` overrides a
//! value from the configuration file.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the bind host
    pub bind_host: Option<String>,
    /// Optional override for the TCP port
    pub tcp_port: Option<u16>,
    /// Optional override for the UDP port
    pub udp_port: Option<u16>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&Self::command().try_get_matches_from(args)?))
    }

    fn command() -> Command {
        Command::new("server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Game server TCP/UDP front end")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("bind")
                    .short('b')
                    .long("bind")
                    .value_name("HOST")
                    .help("Host address both listeners bind to"),
            )
            .arg(
                Arg::new("tcp-port")
                    .long("tcp-port")
                    .value_name("PORT")
                    .help("TCP listen port")
                    .value_parser(clap::value_parser!(u16)),
            )
            .arg(
                Arg::new("udp-port")
                    .long("udp-port")
                    .value_name("PORT")
                    .help("UDP listen port")
                    .value_parser(clap::value_parser!(u16)),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            bind_host: matches.get_one::<String>("bind").cloned(),
            tcp_port: matches.get_one::<u16>("tcp-port").copied(),
            udp_port: matches.get_one::<u16>("udp-port").copied(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}
