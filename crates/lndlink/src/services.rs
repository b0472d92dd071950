//! Bootstrap and the registry of activated domain clients.
//!
//! [`LndServices::connect`] runs the whole bootstrap: resolve credentials,
//! open the connection, check compatibility, resolve permissions, activate
//! clients, and optionally wait for chain sync. Every stage aborts the rest
//! on failure, and nothing opened along the way is left open.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::{
    ChainNotifierClient, InvoicesClient, LightningClient, RouterClient, SignerClient,
    VersionerClient, WalletKitClient,
};
use crate::compat::{self, NodeIdentity};
use crate::credentials::{self, Domain, MacaroonSource, ResolvedCredentials, TlsSource};
use crate::error::{LndError, LndResult};
use crate::network::{ChainParams, Network};
use crate::permissions::{self, MacaroonPouch, PermissionSet};
use crate::shutdown::ShutdownHook;
use crate::sync::{SyncCancel, SyncMonitor};
use crate::transport::{self, AddressDialer, Connection, Dialer};
use crate::version::VersionDescriptor;

/// Everything needed to bootstrap [`LndServices`].
#[derive(Clone)]
pub struct ServicesConfig {
    /// `host:port` of the daemon, or `unix:<path>` for a local socket.
    pub address: String,
    /// Network the daemon must run on.
    pub network: Network,
    /// Macaroon bundle source.
    pub macaroons: MacaroonSource,
    /// TLS trust material source.
    pub tls: TlsSource,
    /// Minimum daemon version; [`VersionDescriptor::minimum_compatible`] if unset.
    pub min_version: Option<VersionDescriptor>,
    /// Custom dial strategy; [`AddressDialer`] if unset.
    pub dialer: Option<Arc<dyn Dialer>>,
    /// Block in [`LndServices::connect`] until the daemon is synced to chain.
    pub block_until_chain_synced: bool,
    /// Cancels the chain sync wait.
    pub chain_sync_cancel: Option<SyncCancel>,
    /// Pacing of the chain sync wait.
    pub sync_monitor: SyncMonitor,
}

impl ServicesConfig {
    /// Configuration for `address` on `network`, with default credential
    /// locations.
    pub fn new(address: impl Into<String>, network: Network) -> Self {
        Self {
            address: address.into(),
            network,
            macaroons: MacaroonSource::default(),
            tls: TlsSource::default(),
            min_version: None,
            dialer: None,
            block_until_chain_synced: false,
            chain_sync_cancel: None,
            sync_monitor: SyncMonitor::default(),
        }
    }

    /// Load per-domain macaroons from `dir`.
    #[must_use]
    pub fn with_macaroon_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.macaroons.dir = Some(dir.into());
        self
    }

    /// Use a single macaroon file for every domain.
    #[must_use]
    pub fn with_macaroon_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.macaroons.path = Some(path.into());
        self
    }

    /// Use raw macaroon bytes for every domain.
    #[must_use]
    pub fn with_raw_macaroon(mut self, raw: Vec<u8>) -> Self {
        self.macaroons.raw = Some(raw);
        self
    }

    /// Read the TLS certificate from `path`.
    #[must_use]
    pub fn with_tls_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.tls.path = Some(path.into());
        self
    }

    /// Use raw PEM bytes as the TLS certificate.
    #[must_use]
    pub fn with_raw_tls(mut self, pem: Vec<u8>) -> Self {
        self.tls.raw = Some(pem);
        self
    }

    /// Require at least `version`.
    #[must_use]
    pub fn with_min_version(mut self, version: VersionDescriptor) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Dial with `dialer` instead of the default TCP/Unix dialer.
    #[must_use]
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Wait for chain sync during bootstrap, until synced or `cancel` fires.
    ///
    /// Accepts a [`SyncCancel`] or a bare `CancellationToken`.
    #[must_use]
    pub fn wait_for_sync(mut self, cancel: impl Into<SyncCancel>) -> Self {
        self.block_until_chain_synced = true;
        self.chain_sync_cancel = Some(cancel.into());
        self
    }

    /// Pace the chain sync wait with `monitor`.
    #[must_use]
    pub fn with_sync_monitor(mut self, monitor: SyncMonitor) -> Self {
        self.sync_monitor = monitor;
        self
    }

    /// The minimum version the daemon is checked against.
    #[must_use]
    pub fn expected_version(&self) -> VersionDescriptor {
        self.min_version.clone().unwrap_or_default()
    }
}

impl fmt::Debug for ServicesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicesConfig")
            .field("address", &self.address)
            .field("network", &self.network)
            .field("macaroons", &self.macaroons)
            .field("tls", &self.tls)
            .field("min_version", &self.min_version)
            .field("custom_dialer", &self.dialer.is_some())
            .field("block_until_chain_synced", &self.block_until_chain_synced)
            .field("sync_monitor", &self.sync_monitor)
            .finish_non_exhaustive()
    }
}

/// Closes the connection, then runs every registered hook once.
struct Teardown {
    connection: Connection,
    hooks: Vec<Box<dyn ShutdownHook>>,
}

impl Teardown {
    fn new(connection: Connection) -> Self {
        Self {
            connection,
            hooks: Vec::new(),
        }
    }

    fn register(&mut self, hook: Box<dyn ShutdownHook>) {
        debug!(hook = hook.name(), "Registered shutdown hook");
        self.hooks.push(hook);
    }

    async fn run(self) {
        self.connection.close().await;
        for hook in self.hooks {
            debug!(hook = hook.name(), "Running shutdown hook");
            hook.shutdown().await;
        }
    }
}

/// Registry of the domain clients of a bootstrapped daemon connection.
///
/// Optional clients are present iff their macaroon was available. The
/// registry owns the connection; [`LndServices::close`] tears it down.
pub struct LndServices {
    lightning: LightningClient,
    versioner: VersionerClient,
    chain_notifier: Option<ChainNotifierClient>,
    invoices: Option<InvoicesClient>,
    signer: Option<SignerClient>,
    wallet_kit: Option<WalletKitClient>,
    router: Option<RouterClient>,

    chain_params: ChainParams,
    node_alias: String,
    node_pubkey: [u8; 33],
    version: VersionDescriptor,
    permissions: PermissionSet,

    teardown: Teardown,
}

impl LndServices {
    /// Connect to the daemon described by `config` and bootstrap every
    /// permitted client.
    ///
    /// # Errors
    ///
    /// Returns the [`LndError`] of the first stage that failed.
    pub async fn connect(config: &ServicesConfig) -> LndResult<Self> {
        // Conflicting sources must fail before any I/O.
        config.macaroons.validate()?;

        info!(
            address = %config.address,
            network = %config.network,
            "Bootstrapping lnd services"
        );

        let credentials = credentials::resolve(&config.macaroons, &config.tls, config.network)?;
        let dialer = config
            .dialer
            .clone()
            .unwrap_or_else(|| Arc::new(AddressDialer::default()));
        let conn =
            transport::establish(&config.address, &credentials.transport, dialer.as_ref()).await?;

        Self::bootstrap(config, &credentials, conn).await
    }

    /// Run the post-connect stages over an already established `conn`.
    ///
    /// # Errors
    ///
    /// Returns the [`LndError`] of the first stage that failed. `conn` is
    /// closed in every error case.
    pub async fn bootstrap(
        config: &ServicesConfig,
        credentials: &ResolvedCredentials,
        conn: Connection,
    ) -> LndResult<Self> {
        let identity = compat::check_compatibility(
            &conn,
            &credentials.readonly,
            config.network,
            &config.expected_version(),
        )
        .await?;

        let (perms, pouch) = match permissions::resolve(&credentials.locator, &credentials.readonly) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(error = %err, "Unable to resolve macaroon permissions");
                Teardown::new(conn).run().await;
                return Err(err);
            },
        };

        let services = match Self::activate(conn, config.network, identity, perms, &pouch) {
            Ok(services) => services,
            Err((err, teardown)) => {
                teardown.run().await;
                return Err(err);
            },
        };

        info!(
            alias = %services.node_alias,
            domains = ?services.enabled_domains(),
            "lnd services activated"
        );

        if config.block_until_chain_synced {
            let cancel = config.chain_sync_cancel.clone().unwrap_or_default();
            info!("Waiting for lnd to be fully synced to its chain backend");
            if let Err(err) = config
                .sync_monitor
                .wait(services.lightning.clone(), cancel)
                .await
            {
                services.close().await;
                return Err(err.into());
            }
        }

        Ok(services)
    }

    fn activate(
        conn: Connection,
        network: Network,
        identity: NodeIdentity,
        permissions: PermissionSet,
        pouch: &MacaroonPouch,
    ) -> Result<Self, (LndError, Teardown)> {
        let conn_ref = conn.downgrade();
        let mut teardown = Teardown::new(conn);

        let core = pouch
            .get(Domain::Lightning)
            .filter(|_| permissions.lightning)
            .cloned();
        let Some(core) = core else {
            let err = LndError::PermissionDenied {
                domain: Domain::Lightning,
                reason: "admin macaroon not available".to_string(),
            };
            return Err((err, teardown));
        };
        let Some(readonly) = pouch.get(Domain::ReadOnly).cloned() else {
            let err = LndError::PermissionDenied {
                domain: Domain::ReadOnly,
                reason: "read-only macaroon not available".to_string(),
            };
            return Err((err, teardown));
        };

        let lightning = LightningClient::new(conn_ref.clone(), core);
        teardown.register(lightning.shutdown_hook());

        let versioner = VersionerClient::new(conn_ref.clone(), readonly);

        let chain_notifier = enabled(&permissions, pouch, Domain::ChainNotifier).map(|mac| {
            let client = ChainNotifierClient::new(conn_ref.clone(), mac);
            teardown.register(client.shutdown_hook());
            client
        });
        let invoices = enabled(&permissions, pouch, Domain::Invoices).map(|mac| {
            let client = InvoicesClient::new(conn_ref.clone(), mac);
            teardown.register(client.shutdown_hook());
            client
        });
        let signer = enabled(&permissions, pouch, Domain::Signer)
            .map(|mac| SignerClient::new(conn_ref.clone(), mac));
        let wallet_kit = enabled(&permissions, pouch, Domain::WalletKit)
            .map(|mac| WalletKitClient::new(conn_ref.clone(), mac));
        let router = enabled(&permissions, pouch, Domain::Router)
            .map(|mac| RouterClient::new(conn_ref.clone(), mac));

        Ok(Self {
            lightning,
            versioner,
            chain_notifier,
            invoices,
            signer,
            wallet_kit,
            router,
            chain_params: network.chain_params(),
            node_alias: identity.alias,
            node_pubkey: identity.pubkey,
            version: identity.version,
            permissions,
            teardown,
        })
    }

    /// Main lightning client.
    #[must_use]
    pub fn lightning(&self) -> &LightningClient {
        &self.lightning
    }

    /// Version endpoint client.
    #[must_use]
    pub fn versioner(&self) -> &VersionerClient {
        &self.versioner
    }

    /// Chain notifier client, if permitted.
    #[must_use]
    pub fn chain_notifier(&self) -> Option<&ChainNotifierClient> {
        self.chain_notifier.as_ref()
    }

    /// Invoices client, if permitted.
    #[must_use]
    pub fn invoices(&self) -> Option<&InvoicesClient> {
        self.invoices.as_ref()
    }

    /// Signer client, if permitted.
    #[must_use]
    pub fn signer(&self) -> Option<&SignerClient> {
        self.signer.as_ref()
    }

    /// Wallet kit client, if permitted.
    #[must_use]
    pub fn wallet_kit(&self) -> Option<&WalletKitClient> {
        self.wallet_kit.as_ref()
    }

    /// Router client, if permitted.
    #[must_use]
    pub fn router(&self) -> Option<&RouterClient> {
        self.router.as_ref()
    }

    /// Parameters of the chain the node runs on.
    #[must_use]
    pub fn chain_params(&self) -> &ChainParams {
        &self.chain_params
    }

    /// Alias of the connected node.
    #[must_use]
    pub fn node_alias(&self) -> &str {
        &self.node_alias
    }

    /// Identity key of the connected node.
    #[must_use]
    pub fn node_pubkey(&self) -> &[u8; 33] {
        &self.node_pubkey
    }

    /// Version the connected node reported.
    #[must_use]
    pub fn version(&self) -> &VersionDescriptor {
        &self.version
    }

    /// Resolved domain permissions.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Names of the enabled domains, including `readonly`.
    #[must_use]
    pub fn enabled_domains(&self) -> Vec<&'static str> {
        self.permissions.enabled_domains()
    }

    /// Close the connection, then run every shutdown hook.
    pub async fn close(self) {
        info!(alias = %self.node_alias, "Closing lnd services");
        self.teardown.run().await;
    }
}

impl fmt::Debug for LndServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LndServices")
            .field("node_alias", &self.node_alias)
            .field("node_pubkey", &hex::encode(self.node_pubkey))
            .field("version", &self.version)
            .field("network", &self.chain_params.network)
            .field("domains", &self.enabled_domains())
            .field("connection", &self.teardown.connection)
            .finish_non_exhaustive()
    }
}

fn enabled(
    permissions: &PermissionSet,
    pouch: &MacaroonPouch,
    domain: Domain,
) -> Option<credentials::Macaroon> {
    if !permissions.allows(domain) {
        return None;
    }
    pouch.get(domain).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::credentials::{MacaroonLocator, TransportCredentials};
    use crate::testing::{MockDaemon, TEST_TLS_CERT, macaroon_dir, scripted_node, test_macaroon};

    struct RecordingHook {
        name: &'static str,
        daemon: MockDaemon,
        log: Arc<Mutex<Vec<(&'static str, usize)>>>,
    }

    #[async_trait]
    impl ShutdownHook for RecordingHook {
        fn name(&self) -> &str {
            self.name
        }

        async fn shutdown(&self) {
            let closes = self.daemon.close_count();
            self.log.lock().unwrap().push((self.name, closes));
        }
    }

    fn credentials(dir: &std::path::Path) -> ResolvedCredentials {
        ResolvedCredentials {
            locator: MacaroonLocator::Dir(dir.to_path_buf()),
            readonly: test_macaroon(Domain::ReadOnly),
            transport: TransportCredentials::from_pem(TEST_TLS_CERT.as_bytes(), "test").unwrap(),
        }
    }

    #[tokio::test]
    async fn teardown_closes_before_hooks_and_runs_each_once() {
        let daemon = MockDaemon::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut teardown = Teardown::new(Connection::new("mock", daemon.channel()));
        for name in ["first", "second", "third"] {
            teardown.register(Box::new(RecordingHook {
                name,
                daemon: daemon.clone(),
                log: Arc::clone(&log),
            }));
        }

        teardown.run().await;

        assert_eq!(daemon.close_count(), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("first", 1), ("second", 1), ("third", 1)]
        );
    }

    #[tokio::test]
    async fn bootstrap_activates_permitted_domains() {
        let dir = tempfile::tempdir().unwrap();
        macaroon_dir(
            dir.path(),
            &[Domain::Lightning, Domain::Invoices, Domain::Signer, Domain::ReadOnly],
        )
        .unwrap();
        let daemon = scripted_node(Network::Regtest);
        let config = ServicesConfig::new("mock", Network::Regtest).with_macaroon_dir(dir.path());

        let services = LndServices::bootstrap(
            &config,
            &credentials(dir.path()),
            Connection::new("mock", daemon.channel()),
        )
        .await
        .unwrap();

        assert_eq!(services.node_alias(), "alice");
        assert_eq!(services.chain_params().network, Network::Regtest);
        assert!(services.invoices().is_some());
        assert!(services.signer().is_some());
        assert!(services.chain_notifier().is_none());
        assert!(services.wallet_kit().is_none());
        assert!(services.router().is_none());
        assert_eq!(
            services.enabled_domains(),
            vec!["lightning", "signer", "invoices", "readonly"]
        );
        // lightning and invoices own background tasks
        assert_eq!(services.teardown.hooks.len(), 2);

        services.close().await;
        assert_eq!(daemon.close_count(), 1);
    }

    #[tokio::test]
    async fn missing_admin_macaroon_closes_connection() {
        let dir = tempfile::tempdir().unwrap();
        macaroon_dir(dir.path(), &[Domain::ReadOnly, Domain::Router]).unwrap();
        let daemon = scripted_node(Network::Regtest);
        let config = ServicesConfig::new("mock", Network::Regtest);

        let err = LndServices::bootstrap(
            &config,
            &credentials(dir.path()),
            Connection::new("mock", daemon.channel()),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            LndError::PermissionDenied {
                domain: Domain::Lightning,
                ..
            }
        ));
        assert_eq!(daemon.close_count(), 1);
    }

    #[tokio::test]
    async fn conflicting_sources_fail_before_dialing() {
        struct PanicDialer;

        #[async_trait]
        impl Dialer for PanicDialer {
            async fn dial(&self, _address: &str) -> std::io::Result<transport::BoxedStream> {
                panic!("must not dial");
            }
        }

        let config = ServicesConfig::new("localhost:10009", Network::Mainnet)
            .with_macaroon_dir("/nonexistent/dir")
            .with_macaroon_path("/nonexistent/admin.macaroon")
            .with_dialer(Arc::new(PanicDialer));

        let err = LndServices::connect(&config).await.unwrap_err();
        assert!(matches!(err, LndError::Configuration(_)));
    }

    #[test]
    fn expected_version_defaults_to_minimum() {
        let config = ServicesConfig::new("localhost", Network::Testnet);
        assert_eq!(config.expected_version(), VersionDescriptor::minimum_compatible());

        let config = config.with_min_version(VersionDescriptor::new(0, 16, 0));
        assert_eq!(config.expected_version(), VersionDescriptor::new(0, 16, 0));
    }

    #[test]
    fn config_debug_hides_raw_material() {
        let config = ServicesConfig::new("localhost", Network::Testnet)
            .with_raw_macaroon(vec![0xde, 0xad])
            .with_raw_tls(b"-----BEGIN CERTIFICATE-----".to_vec());
        let debug = format!("{config:?}");
        assert!(!debug.contains("222"));
        assert!(debug.contains("<redacted>"));
    }
}
