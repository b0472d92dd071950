//! Credential resolution: TLS trust material and per-domain macaroons.
//!
//! Resolution happens before any network activity. Conflicting source
//! selection is rejected up front with [`LndError::Configuration`]; unreadable
//! or malformed material surfaces as [`CredentialError`].

mod macaroon;
mod tls;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use macaroon::{Macaroon, MacaroonLocator};
pub use tls::{TlsSource, TransportCredentials};

use crate::error::{LndError, LndResult};
use crate::network::Network;

/// Name of lnd's TLS certificate inside its data directory.
pub const DEFAULT_TLS_CERT_FILENAME: &str = "tls.cert";

/// Errors raised while loading TLS or macaroon material.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A credential file could not be read.
    #[error("unable to read {what} from {}: {source}", .path.display())]
    Read {
        /// What was being read.
        what: &'static str,
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A macaroon file exists but holds no bytes.
    #[error("macaroon file {} is empty", .0.display())]
    EmptyMacaroon(PathBuf),

    /// The PEM bundle held no certificates.
    #[error("no certificates found in {0}")]
    NoCertificates(String),

    /// A certificate could not be parsed or added to the trust store.
    #[error("invalid certificate in {origin}: {reason}")]
    InvalidCertificate {
        /// Where the certificate came from.
        origin: String,
        /// Parser or trust-store failure.
        reason: String,
    },

    /// The TLS client configuration could not be built.
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// Functional domains of the lnd RPC surface, each authorized by its own macaroon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Main lightning RPC (admin macaroon). Mandatory.
    Lightning,
    /// On-chain wallet sub-server.
    WalletKit,
    /// Chain notification sub-server.
    ChainNotifier,
    /// Signing sub-server.
    Signer,
    /// Invoices sub-server.
    Invoices,
    /// Router sub-server.
    Router,
    /// Read-only access, sufficient for status and version queries.
    ReadOnly,
}

impl Domain {
    /// Every domain, in activation-report order.
    pub const ALL: [Self; 7] = [
        Self::Lightning,
        Self::WalletKit,
        Self::Router,
        Self::Signer,
        Self::Invoices,
        Self::ChainNotifier,
        Self::ReadOnly,
    ];

    /// Name used when listing enabled domains.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lightning => "lightning",
            Self::WalletKit => "walletkit",
            Self::ChainNotifier => "chainnotifier",
            Self::Signer => "signer",
            Self::Invoices => "invoices",
            Self::Router => "router",
            Self::ReadOnly => "readonly",
        }
    }

    /// Default macaroon file name for this domain inside a macaroon directory.
    #[must_use]
    pub const fn macaroon_filename(self) -> &'static str {
        match self {
            Self::Lightning => "admin.macaroon",
            Self::WalletKit => "walletkit.macaroon",
            Self::ChainNotifier => "chainnotifier.macaroon",
            Self::Signer => "signer.macaroon",
            Self::Invoices => "invoices.macaroon",
            Self::Router => "router.macaroon",
            Self::ReadOnly => "readonly.macaroon",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the macaroon bundle comes from.
///
/// Raw bytes override both path-based sources and apply to every domain.
#[derive(Clone, Default)]
pub struct MacaroonSource {
    /// Directory holding one macaroon file per domain.
    pub dir: Option<PathBuf>,
    /// Single macaroon file used for every domain.
    pub path: Option<PathBuf>,
    /// Raw macaroon bytes used for every domain.
    pub raw: Option<Vec<u8>>,
}

impl fmt::Debug for MacaroonSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacaroonSource")
            .field("dir", &self.dir)
            .field("path", &self.path)
            .field("raw", &self.raw.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl MacaroonSource {
    /// Rejects a directory and an explicit path configured together.
    ///
    /// # Errors
    ///
    /// Returns [`LndError::Configuration`] when both are set and no raw
    /// override is present.
    pub fn validate(&self) -> LndResult<()> {
        if self.raw.is_none() && self.dir.is_some() && self.path.is_some() {
            return Err(LndError::Configuration(
                "if a raw macaroon is not provided, must set either the macaroon directory \
                 or the custom macaroon path but not both"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve this source into a locator, deriving the default directory
    /// from `network` when nothing else is configured.
    ///
    /// # Errors
    ///
    /// Returns [`LndError::Configuration`] when the source is conflicting
    /// or no default location can be derived.
    pub fn resolve(&self, network: Network) -> LndResult<MacaroonLocator> {
        self.validate()?;

        if let Some(raw) = &self.raw {
            return Ok(MacaroonLocator::Raw(Macaroon::from_bytes(raw.clone())));
        }
        if let Some(path) = &self.path {
            return Ok(MacaroonLocator::File(path.clone()));
        }
        let dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => default_macaroon_dir(&lnd_dir()?, network),
        };
        debug!(dir = %dir.display(), "Using macaroon directory");
        Ok(MacaroonLocator::Dir(dir))
    }
}

/// lnd's application data directory for the current user.
///
/// # Errors
///
/// Returns [`LndError::Configuration`] if no home directory can be found.
pub fn lnd_dir() -> LndResult<PathBuf> {
    let base = directories::BaseDirs::new().ok_or_else(|| {
        LndError::Configuration("unable to determine home directory".to_string())
    })?;

    let dir = if cfg!(target_os = "macos") {
        base.data_dir().join("Lnd")
    } else if cfg!(windows) {
        base.data_local_dir().join("Lnd")
    } else {
        base.home_dir().join(".lnd")
    };
    Ok(dir)
}

/// Default macaroon directory for `network` below an lnd data directory.
#[must_use]
pub fn default_macaroon_dir(lnd_dir: &Path, network: Network) -> PathBuf {
    lnd_dir
        .join("data")
        .join("chain")
        .join("bitcoin")
        .join(network.as_str())
}

/// Everything credential resolution produces before a connection is opened.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    /// Where per-domain macaroons are loaded from.
    pub locator: MacaroonLocator,
    /// The read-only macaroon used for compatibility checks.
    pub readonly: Macaroon,
    /// TLS trust material for the transport.
    pub transport: TransportCredentials,
}

/// Resolve the macaroon bundle location, the read-only macaroon, and TLS
/// trust material.
///
/// # Errors
///
/// Returns [`LndError::Configuration`] for conflicting sources (before any
/// I/O) and [`LndError::CredentialLoad`] for unreadable material.
pub fn resolve(
    macaroons: &MacaroonSource,
    tls: &TlsSource,
    network: Network,
) -> LndResult<ResolvedCredentials> {
    let locator = macaroons.resolve(network)?;
    let transport = tls.load()?;
    let readonly = locator.load(Domain::ReadOnly)?;

    Ok(ResolvedCredentials {
        locator,
        readonly,
        transport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_and_path_together_rejected() {
        let source = MacaroonSource {
            dir: Some(PathBuf::from("/tmp/macaroons")),
            path: Some(PathBuf::from("/tmp/admin.macaroon")),
            raw: None,
        };
        let err = source.resolve(Network::Regtest).unwrap_err();
        assert!(matches!(err, LndError::Configuration(_)));
    }

    #[test]
    fn raw_bytes_override_conflicting_paths() {
        let source = MacaroonSource {
            dir: Some(PathBuf::from("/tmp/macaroons")),
            path: Some(PathBuf::from("/tmp/admin.macaroon")),
            raw: Some(vec![1, 2, 3]),
        };
        let locator = source.resolve(Network::Regtest).unwrap();
        assert!(matches!(locator, MacaroonLocator::Raw(_)));
    }

    #[test]
    fn explicit_path_used_for_every_domain() {
        let source = MacaroonSource {
            path: Some(PathBuf::from("/tmp/custom.macaroon")),
            ..MacaroonSource::default()
        };
        let locator = source.resolve(Network::Mainnet).unwrap();
        assert_eq!(
            locator.path_for(Domain::Signer),
            Some(PathBuf::from("/tmp/custom.macaroon"))
        );
    }

    #[test]
    fn default_dir_follows_network() {
        let dir = default_macaroon_dir(Path::new("/home/u/.lnd"), Network::Testnet);
        assert_eq!(
            dir,
            PathBuf::from("/home/u/.lnd/data/chain/bitcoin/testnet")
        );
    }

    #[test]
    fn debug_redacts_raw_macaroon() {
        let source = MacaroonSource {
            raw: Some(vec![0xde, 0xad]),
            ..MacaroonSource::default()
        };
        let rendered = format!("{source:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("222"));
    }

    #[test]
    fn domain_names_and_files() {
        assert_eq!(Domain::Lightning.macaroon_filename(), "admin.macaroon");
        assert_eq!(Domain::ReadOnly.name(), "readonly");
        assert_eq!(Domain::ChainNotifier.to_string(), "chainnotifier");
    }
}
