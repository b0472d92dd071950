//! Configuration types.
//!
//! These types have no dependency on the `lndlink` crate. Values stay in
//! their textual form here and are converted to domain types at the
//! boundary. Every struct implements [`Default`] so that a bare `[section]`
//! header produces a working configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Daemon address, network and credential locations.
    pub lnd: LndSection,
    /// Chain sync wait.
    pub sync: SyncSection,
    /// Logging level and format.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// LndSection
// ---------------------------------------------------------------------------

/// Connection settings for the daemon.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LndSection {
    /// `host:port` or `unix:<path>`.
    pub address: String,
    /// `mainnet`, `testnet`, `regtest` or `simnet`.
    pub network: String,
    /// Directory with one macaroon per domain. Exclusive with
    /// `macaroon_path`.
    pub macaroon_dir: Option<String>,
    /// Single macaroon file for every domain. Exclusive with
    /// `macaroon_dir`.
    pub macaroon_path: Option<String>,
    /// Hex-encoded macaroon, overriding both file sources.
    #[serde(skip_serializing)]
    pub macaroon_hex: Option<String>,
    /// TLS certificate path; lnd's default location if unset.
    pub tls_path: Option<String>,
    /// Minimum daemon version, `major.minor.patch`.
    pub min_version: Option<String>,
    /// Build tags the daemon must carry; the built-in set if unset.
    pub build_tags: Option<Vec<String>>,
}

impl Default for LndSection {
    fn default() -> Self {
        Self {
            address: "localhost:10009".to_owned(),
            network: "mainnet".to_owned(),
            macaroon_dir: None,
            macaroon_path: None,
            macaroon_hex: None,
            tls_path: None,
            min_version: None,
            build_tags: None,
        }
    }
}

impl fmt::Debug for LndSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LndSection")
            .field("address", &self.address)
            .field("network", &self.network)
            .field("macaroon_dir", &self.macaroon_dir)
            .field("macaroon_path", &self.macaroon_path)
            .field("has_macaroon_hex", &self.macaroon_hex.is_some())
            .field("tls_path", &self.tls_path)
            .field("min_version", &self.min_version)
            .field("build_tags", &self.build_tags)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SyncSection
// ---------------------------------------------------------------------------

/// Chain sync wait settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Block during startup until the daemon is synced to chain.
    pub wait: bool,
    /// Seconds between two sync status polls.
    pub poll_interval_secs: u64,
    /// Upper bound on a single status poll, in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            wait: false,
            poll_interval_secs: 5,
            rpc_timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level: `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    /// Per-crate directives, e.g. `["lndlink=debug", "jsonrpsee=warn"]`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
