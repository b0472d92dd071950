//! Canned daemon responses and credential fixtures.

use std::path::Path;

use serde_json::{Value, json};

use super::MockDaemon;
use crate::credentials::{Domain, Macaroon};
use crate::network::Network;
use crate::version::DEFAULT_BUILD_TAGS;

/// Self-signed certificate for `localhost`.
pub const TEST_TLS_CERT: &str = include_str!("../../testdata/tls.cert");

/// PKCS#8 private key for [`TEST_TLS_CERT`].
pub const TEST_TLS_KEY: &str = include_str!("../../testdata/tls.key");

/// Alias reported by [`info_response`].
pub const TEST_ALIAS: &str = "alice";

/// Identity key reported by [`info_response`].
pub const TEST_PUBKEY_HEX: &str =
    "02eec7245d6b7d2ccb30380bfbe2a3648cd7a942653f5aa340edcea1f283686619";

/// Macaroon bytes used for `domain` by [`macaroon_dir`].
#[must_use]
pub fn test_macaroon(domain: Domain) -> Macaroon {
    Macaroon::from_bytes(domain.name().as_bytes().to_vec())
}

/// A `lnrpc.GetInfo` response for a node on `network`.
#[must_use]
pub fn info_response(network: &str, synced_to_chain: bool) -> Value {
    json!({
        "alias": TEST_ALIAS,
        "identity_pubkey": TEST_PUBKEY_HEX,
        "block_height": 800_000,
        "synced_to_chain": synced_to_chain,
        "chains": [{"chain": "bitcoin", "network": network}],
    })
}

/// A `verrpc.GetVersion` response.
#[must_use]
pub fn version_response(major: u32, minor: u32, patch: u32, build_tags: &[&str]) -> Value {
    json!({
        "app_major": major,
        "app_minor": minor,
        "app_patch": patch,
        "build_tags": build_tags,
        "version": format!("{major}.{minor}.{patch}-beta"),
        "commit": format!("v{major}.{minor}.{patch}-beta"),
    })
}

/// A daemon on `network` that is synced and runs a recent version with
/// every default build tag.
#[must_use]
pub fn scripted_node(network: Network) -> MockDaemon {
    let daemon = MockDaemon::new();
    daemon.respond("lnrpc.GetInfo", info_response(network.as_str(), true));
    daemon.respond(
        "verrpc.GetVersion",
        version_response(0, 17, 4, &DEFAULT_BUILD_TAGS),
    );
    daemon
}

/// Write a macaroon file for each of `domains` into `dir`.
///
/// Each file holds the bytes of [`test_macaroon`] for its domain.
///
/// # Errors
///
/// Returns an I/O error if a file cannot be written.
pub fn macaroon_dir(dir: &Path, domains: &[Domain]) -> std::io::Result<()> {
    for domain in domains {
        std::fs::write(
            dir.join(domain.macaroon_filename()),
            test_macaroon(*domain).as_bytes(),
        )?;
    }
    Ok(())
}
