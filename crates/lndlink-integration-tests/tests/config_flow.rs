//! From a config file to a dial attempt.

mod common;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{ALL_DOMAINS, write_credentials};
use lndlink::transport::BoxedStream;
use lndlink::{Dialer, ErrorKind, LndError, LndServices, Network, ServicesConfig};
use lndlink_config::Config;

#[derive(Default)]
struct RefusingDialer {
    attempts: AtomicUsize,
}

#[async_trait]
impl Dialer for RefusingDialer {
    async fn dial(&self, _address: &str) -> io::Result<BoxedStream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))
    }
}

fn write_config(dir: &std::path::Path, lnd_section: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, format!("[lnd]\n{lnd_section}")).unwrap();
    path
}

#[tokio::test]
async fn config_file_reaches_the_dialer() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &ALL_DOMAINS);
    let path = write_config(
        dir.path(),
        &format!(
            "address = \"127.0.0.1:1\"\nnetwork = \"testnet\"\nmacaroon_dir = \"{0}\"\ntls_path = \"{0}/tls.cert\"\n",
            dir.path().display()
        ),
    );

    let config = Config::load(Some(path.as_path())).unwrap();
    let dialer = Arc::new(RefusingDialer::default());
    let services_config = ServicesConfig::try_from(&config)
        .unwrap()
        .with_dialer(dialer.clone());
    assert_eq!(services_config.network, Network::Testnet);

    let err = LndServices::connect(&services_config).await.unwrap_err();

    assert!(matches!(err, LndError::Transport { ref address, .. } if address == "127.0.0.1:1"));
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(dialer.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_readonly_macaroon_fails_before_dialing() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &[lndlink::Domain::Lightning]);

    let dialer = Arc::new(RefusingDialer::default());
    let config = ServicesConfig::new("127.0.0.1:1", Network::Regtest)
        .with_macaroon_dir(dir.path())
        .with_tls_path(dir.path().join("tls.cert"))
        .with_dialer(dialer.clone());

    let err = LndServices::connect(&config).await.unwrap_err();

    assert!(matches!(err, LndError::CredentialLoad(_)));
    assert_eq!(dialer.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn conflicting_sources_are_rejected_by_the_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "macaroon_dir = \"/a\"\nmacaroon_path = \"/b/admin.macaroon\"\n",
    );

    let err = Config::load(Some(path.as_path())).unwrap_err();
    assert!(err.to_string().contains("macaroon"));
}

#[test]
fn unknown_network_is_rejected() {
    let mut config = Config::default();
    config.lnd.network = "signet".to_string();

    assert!(ServicesConfig::try_from(&config).is_err());
}
