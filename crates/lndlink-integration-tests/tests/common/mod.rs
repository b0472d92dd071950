//! Shared harness for integration tests.

use std::path::Path;

use lndlink::credentials::{self, ResolvedCredentials};
use lndlink::testing::{MockDaemon, TEST_TLS_CERT, macaroon_dir, scripted_node};
use lndlink::transport::Connection;
use lndlink::{Domain, LndResult, LndServices, Network, ServicesConfig};
use tempfile::TempDir;

/// Every domain with a macaroon file.
#[allow(dead_code)]
pub const ALL_DOMAINS: [Domain; 7] = Domain::ALL;

/// A scripted node plus on-disk credentials pointing at it.
///
/// Owns a `TempDir` holding the macaroon files and TLS certificate. The
/// directory is removed when the harness is dropped.
#[allow(dead_code)]
pub struct NodeHarness {
    /// The scripted daemon.
    pub daemon: MockDaemon,
    /// Bootstrap configuration.
    pub config: ServicesConfig,
    /// Credentials resolved from `config`.
    pub credentials: ResolvedCredentials,
    dir: TempDir,
}

#[allow(dead_code)]
impl NodeHarness {
    /// A synced, up-to-date node on `network` with macaroons for `domains`.
    pub fn new(network: Network, domains: &[Domain]) -> Self {
        Self::with_daemon(scripted_node(network), network, domains)
    }

    /// Like [`NodeHarness::new`], with a custom daemon script.
    pub fn with_daemon(daemon: MockDaemon, network: Network, domains: &[Domain]) -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        write_credentials(dir.path(), domains);

        let config = ServicesConfig::new("mock:10009", network)
            .with_macaroon_dir(dir.path())
            .with_tls_path(dir.path().join("tls.cert"));
        let credentials = credentials::resolve(&config.macaroons, &config.tls, network)
            .expect("credentials should resolve");

        Self {
            daemon,
            config,
            credentials,
            dir,
        }
    }

    /// Directory holding the credentials.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// A fresh connection to the scripted daemon.
    pub fn connection(&self) -> Connection {
        Connection::new(self.config.address.clone(), self.daemon.channel())
    }

    /// Run the post-connect bootstrap stages against the daemon.
    pub async fn bootstrap(&self) -> LndResult<LndServices> {
        LndServices::bootstrap(&self.config, &self.credentials, self.connection()).await
    }
}

/// Write macaroon files for `domains` and a TLS certificate into `dir`.
pub fn write_credentials(dir: &Path, domains: &[Domain]) {
    macaroon_dir(dir, domains).expect("failed to write macaroons");
    std::fs::write(dir.join("tls.cert"), TEST_TLS_CERT).expect("failed to write tls.cert");
}
