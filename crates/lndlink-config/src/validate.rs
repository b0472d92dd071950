//! Post-load configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Networks an lnd node can run on.
pub const KNOWN_NETWORKS: [&str; 4] = ["mainnet", "testnet", "regtest", "simnet"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Validate a fully loaded configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_lnd(config)?;
    validate_sync(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_lnd(config: &Config) -> ConfigResult<()> {
    let lnd = &config.lnd;

    if lnd.address.trim().is_empty() {
        return Err(invalid("lnd.address", "address must not be empty"));
    }

    if !KNOWN_NETWORKS.contains(&lnd.network.as_str()) {
        return Err(invalid(
            "lnd.network",
            format!(
                "unsupported network '{}'; expected one of: {}",
                lnd.network,
                KNOWN_NETWORKS.join(", ")
            ),
        ));
    }

    if lnd.macaroon_hex.is_none() && lnd.macaroon_dir.is_some() && lnd.macaroon_path.is_some() {
        return Err(invalid(
            "lnd.macaroon_path",
            "set either macaroon_dir or macaroon_path, not both",
        ));
    }

    if let Some(hex) = &lnd.macaroon_hex
        && (hex.is_empty() || hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()))
    {
        return Err(invalid("lnd.macaroon_hex", "macaroon must be non-empty hex"));
    }

    if let Some(version) = &lnd.min_version {
        parse_version(version).ok_or_else(|| {
            invalid(
                "lnd.min_version",
                format!("'{version}' is not a major.minor.patch version"),
            )
        })?;
    }

    if let Some(tags) = &lnd.build_tags
        && tags.iter().any(|t| t.trim().is_empty())
    {
        return Err(invalid("lnd.build_tags", "build tags must not be empty"));
    }

    Ok(())
}

fn validate_sync(config: &Config) -> ConfigResult<()> {
    let sync = &config.sync;

    if sync.poll_interval_secs == 0 {
        return Err(invalid("sync.poll_interval_secs", "must be at least 1"));
    }
    if sync.rpc_timeout_secs == 0 {
        return Err(invalid("sync.rpc_timeout_secs", "must be at least 1"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;

    if !LOG_LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!("unknown level '{}'", logging.level),
        ));
    }
    if !LOG_FORMATS.contains(&logging.format.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}

/// Parse `major.minor.patch`, tolerating a leading `v` and a `-suffix`.
#[must_use]
pub fn parse_version(s: &str) -> Option<(u32, u32, u32)> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);
    let s = s.split_once('-').map_or(s, |(core, _)| core);

    let mut parts = s.split('.').map(str::parse::<u32>);
    let major = parts.next()?.ok()?;
    let minor = parts.next()?.ok()?;
    let patch = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_unknown_network() {
        let mut config = Config::default();
        config.lnd.network = "signet".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "lnd.network"));
    }

    #[test]
    fn rejects_dir_and_path_together() {
        let mut config = Config::default();
        config.lnd.macaroon_dir = Some("/a".to_owned());
        config.lnd.macaroon_path = Some("/b/admin.macaroon".to_owned());
        assert!(validate(&config).is_err());

        config.lnd.macaroon_hex = Some("0201".to_owned());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_bad_hex_macaroon() {
        let mut config = Config::default();
        config.lnd.macaroon_hex = Some("xyz".to_owned());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.sync.poll_interval_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn parses_versions() {
        assert_eq!(parse_version("0.11.0"), Some((0, 11, 0)));
        assert_eq!(parse_version("v0.17.4-beta"), Some((0, 17, 4)));
        assert_eq!(parse_version("0.11"), None);
        assert_eq!(parse_version("0.11.0.1"), None);
        assert_eq!(parse_version("a.b.c"), None);
    }
}
