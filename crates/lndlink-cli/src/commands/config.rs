//! Config command.

use anyhow::{Context, Result};
use colored::Colorize;
use lndlink_config::Config;

/// Print the effective configuration as TOML.
pub(crate) fn show(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("failed to render configuration")?;
    println!("{rendered}");
    if config.lnd.macaroon_hex.is_some() {
        println!("{}", "# lnd.macaroon_hex is set (hidden)".dimmed());
    }
    Ok(())
}

/// Print where the config file is looked up.
pub(crate) fn path() {
    match lndlink_config::loader::default_config_path() {
        Some(path) => {
            let marker = if path.exists() {
                "exists".green()
            } else {
                "not found".yellow()
            };
            println!("{} ({marker})", path.display());
        },
        None => println!("{}", "No home directory; only environment and defaults apply".yellow()),
    }
}
