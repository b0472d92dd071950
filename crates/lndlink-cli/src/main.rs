//! lndlink CLI.
//!
//! Connects to an lnd node, runs the compatibility and permission checks,
//! and reports what the configured credentials can reach.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lndlink_config::Config;
use lndlink_telemetry::LogConfig;

mod commands;

/// lndlink - authenticated lnd bootstrap
#[derive(Parser)]
#[command(name = "lndlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags that take precedence over the config file.
#[derive(Args)]
struct Overrides {
    /// Daemon address (`host:port` or `unix:<path>`)
    #[arg(long, global = true)]
    address: Option<String>,

    /// Network the daemon must run on
    #[arg(long, global = true)]
    network: Option<String>,

    /// Directory with one macaroon per domain
    #[arg(long, global = true, conflicts_with = "macaroon_path")]
    macaroon_dir: Option<String>,

    /// Single macaroon file used for every domain
    #[arg(long, global = true)]
    macaroon_path: Option<String>,

    /// TLS certificate path
    #[arg(long, global = true)]
    tls_path: Option<String>,

    /// Block until the daemon is synced to chain
    #[arg(long, global = true)]
    wait_sync: bool,

    /// Log level filter
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    log_format: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(address) = self.address {
            config.lnd.address = address;
        }
        if let Some(network) = self.network {
            config.lnd.network = network;
        }
        if self.macaroon_dir.is_some() {
            config.lnd.macaroon_dir = self.macaroon_dir;
            config.lnd.macaroon_path = None;
        }
        if self.macaroon_path.is_some() {
            config.lnd.macaroon_path = self.macaroon_path;
            config.lnd.macaroon_dir = None;
        }
        if self.tls_path.is_some() {
            config.lnd.tls_path = self.tls_path;
        }
        if self.wait_sync {
            config.sync.wait = true;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, run all checks and print a report (default)
    Connect {
        /// Print `key=value` lines without colors
        #[arg(long)]
        plain: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Show the default config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.overrides.apply(&mut config);

    let mut log_config = LogConfig::try_from(&config.logging)?;
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = lndlink_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        None => commands::connect::run(&config, false).await,
        Some(Commands::Connect { plain }) => commands::connect::run(&config, plain).await,
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => commands::config::show(&config),
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_replace_file_values() {
        let cli = Cli::parse_from([
            "lndlink",
            "--address",
            "node:10009",
            "--network",
            "regtest",
            "--macaroon-path",
            "/tmp/admin.macaroon",
            "--wait-sync",
        ]);
        let mut config = Config::default();
        config.lnd.macaroon_dir = Some("/var/lnd".to_string());
        cli.overrides.apply(&mut config);

        assert_eq!(config.lnd.address, "node:10009");
        assert_eq!(config.lnd.network, "regtest");
        assert_eq!(config.lnd.macaroon_path.as_deref(), Some("/tmp/admin.macaroon"));
        assert!(config.lnd.macaroon_dir.is_none());
        assert!(config.sync.wait);
    }

    #[test]
    fn conflicting_macaroon_flags_are_rejected() {
        let result = Cli::try_parse_from([
            "lndlink",
            "--macaroon-dir",
            "/a",
            "--macaroon-path",
            "/b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn no_flags_leave_config_untouched() {
        let cli = Cli::parse_from(["lndlink", "config", "show"]);
        let mut config = Config::default();
        cli.overrides.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
