//! Conversion from file/env configuration into [`ServicesConfig`].

use std::path::PathBuf;
use std::time::Duration;

use lndlink_config::Config;

use crate::error::LndError;
use crate::network::Network;
use crate::services::ServicesConfig;
use crate::sync::SyncMonitor;
use crate::version::{DEFAULT_BUILD_TAGS, VersionDescriptor};

impl TryFrom<&Config> for ServicesConfig {
    type Error = LndError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        let lnd = &config.lnd;
        let network: Network = lnd.network.parse()?;

        let mut services = Self::new(lnd.address.clone(), network);
        services.macaroons.dir = lnd.macaroon_dir.as_ref().map(PathBuf::from);
        services.macaroons.path = lnd.macaroon_path.as_ref().map(PathBuf::from);
        services.macaroons.raw = lnd
            .macaroon_hex
            .as_deref()
            .map(hex::decode)
            .transpose()
            .map_err(|e| LndError::Configuration(format!("invalid macaroon hex: {e}")))?;
        services.tls.path = lnd.tls_path.as_ref().map(PathBuf::from);

        if let Some(min_version) = &lnd.min_version {
            let version: VersionDescriptor = min_version.parse().map_err(|e| {
                LndError::Configuration(format!("invalid min_version '{min_version}': {e}"))
            })?;
            let tags = match &lnd.build_tags {
                Some(tags) => tags.clone(),
                None => DEFAULT_BUILD_TAGS.iter().map(|t| (*t).to_string()).collect(),
            };
            services.min_version = Some(version.with_build_tags(tags));
        } else if let Some(tags) = &lnd.build_tags {
            services.min_version =
                Some(VersionDescriptor::minimum_compatible().with_build_tags(tags.clone()));
        }

        services.block_until_chain_synced = config.sync.wait;
        services.sync_monitor = SyncMonitor::new(
            Duration::from_secs(config.sync.poll_interval_secs),
            Duration::from_secs(config.sync.rpc_timeout_secs),
        );

        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_defaults() {
        let services = ServicesConfig::try_from(&Config::default()).unwrap();
        assert_eq!(services.address, "localhost:10009");
        assert_eq!(services.network, Network::Mainnet);
        assert_eq!(services.expected_version(), VersionDescriptor::minimum_compatible());
        assert!(!services.block_until_chain_synced);
    }

    #[test]
    fn min_version_keeps_default_tags() {
        let mut config = Config::default();
        config.lnd.min_version = Some("0.16.0".to_string());
        let services = ServicesConfig::try_from(&config).unwrap();

        let expected = services.expected_version();
        assert_eq!((expected.major, expected.minor, expected.patch), (0, 16, 0));
        assert_eq!(expected.build_tags.len(), DEFAULT_BUILD_TAGS.len());
    }

    #[test]
    fn raw_macaroon_is_decoded() {
        let mut config = Config::default();
        config.lnd.macaroon_hex = Some("0201".to_string());
        let services = ServicesConfig::try_from(&config).unwrap();
        assert_eq!(services.macaroons.raw, Some(vec![0x02, 0x01]));
    }

    #[test]
    fn unknown_network_is_configuration_error() {
        let mut config = Config::default();
        config.lnd.network = "signet".to_string();
        assert!(matches!(
            ServicesConfig::try_from(&config),
            Err(LndError::Configuration(_))
        ));
    }
}
