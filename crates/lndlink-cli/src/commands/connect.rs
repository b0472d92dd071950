//! Connect command: bootstrap and report.

use anyhow::Result;
use colored::Colorize;
use lndlink::prelude::*;
use lndlink_config::Config;
use tracing::debug;

/// Bootstrap against the configured node and print what is reachable.
pub(crate) async fn run(config: &Config, plain: bool) -> Result<()> {
    let mut services_config = ServicesConfig::try_from(config)?;

    if services_config.block_until_chain_synced {
        let cancel = SyncCancel::new();
        services_config = services_config.wait_for_sync(cancel.clone());
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received, cancelling chain sync wait");
                cancel.cancel("interrupted by Ctrl-C");
            }
        });
    }

    if !plain {
        println!(
            "{} {} ({})",
            "Connecting to".cyan(),
            services_config.address.bold(),
            services_config.network
        );
    }

    let services = match LndServices::connect(&services_config).await {
        Ok(services) => services,
        Err(e) => {
            if !plain {
                println!("{} {e}", "FAIL".red().bold());
            }
            return Err(e.into());
        },
    };

    if plain {
        print_plain(&services);
    } else {
        print_report(&services);
    }

    services.close().await;
    Ok(())
}

fn print_report(services: &LndServices) {
    println!("{}", "OK".green().bold());
    println!("  Alias:   {}", services.node_alias());
    println!("  Pubkey:  {}", hex::encode(services.node_pubkey()));
    println!("  Version: {}", services.version());
    println!("  Network: {}", services.chain_params().network);

    println!("\n{}", "Domains:".cyan());
    for domain in Domain::ALL {
        if services.permissions().allows(domain) {
            println!("  {} {}", "OK".green(), domain);
        } else {
            println!("  {} {}", "--".dimmed(), domain);
        }
    }
    for (domain, reason) in services.permissions().diagnostics() {
        println!("    {}: {}", domain, reason.dimmed());
    }
}

fn print_plain(services: &LndServices) {
    println!("alias={}", services.node_alias());
    println!("pubkey={}", hex::encode(services.node_pubkey()));
    println!("version={}", services.version().short());
    println!("network={}", services.chain_params().network);
    println!("domains={}", services.enabled_domains().join(","));
}
