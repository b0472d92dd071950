//! Which domains the configured macaroons grant access to.
//!
//! A domain is enabled iff its macaroon loads. The core domain is mandatory;
//! every other domain degrades to disabled, with the reason kept as a
//! diagnostic and logged.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::credentials::{Domain, Macaroon, MacaroonLocator};
use crate::error::{LndError, LndResult};

/// Per-domain access flags, fixed once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    /// Main lightning RPC.
    pub lightning: bool,
    /// Wallet-kit sub-server.
    pub wallet_kit: bool,
    /// Chain-notifier sub-server.
    pub chain_notifier: bool,
    /// Signer sub-server.
    pub signer: bool,
    /// Invoices sub-server.
    pub invoices: bool,
    /// Router sub-server.
    pub router: bool,
    /// Read-only access, which also covers the version endpoint.
    pub read_only: bool,
    diagnostics: Vec<(Domain, String)>,
}

impl PermissionSet {
    /// Whether `domain` is enabled.
    #[must_use]
    pub const fn allows(&self, domain: Domain) -> bool {
        match domain {
            Domain::Lightning => self.lightning,
            Domain::WalletKit => self.wallet_kit,
            Domain::ChainNotifier => self.chain_notifier,
            Domain::Signer => self.signer,
            Domain::Invoices => self.invoices,
            Domain::Router => self.router,
            Domain::ReadOnly => self.read_only,
        }
    }

    fn set(&mut self, domain: Domain, enabled: bool) {
        let flag = match domain {
            Domain::Lightning => &mut self.lightning,
            Domain::WalletKit => &mut self.wallet_kit,
            Domain::ChainNotifier => &mut self.chain_notifier,
            Domain::Signer => &mut self.signer,
            Domain::Invoices => &mut self.invoices,
            Domain::Router => &mut self.router,
            Domain::ReadOnly => &mut self.read_only,
        };
        *flag = enabled;
    }

    /// Names of the enabled domains, in report order.
    #[must_use]
    pub fn enabled_domains(&self) -> Vec<&'static str> {
        Domain::ALL
            .into_iter()
            .filter(|d| self.allows(*d))
            .map(Domain::name)
            .collect()
    }

    /// Why each disabled domain is disabled.
    #[must_use]
    pub fn diagnostics(&self) -> &[(Domain, String)] {
        &self.diagnostics
    }
}

/// Macaroons of the enabled domains.
#[derive(Debug, Clone, Default)]
pub struct MacaroonPouch {
    macaroons: HashMap<Domain, Macaroon>,
}

impl MacaroonPouch {
    /// The macaroon for `domain`, if that domain is enabled.
    #[must_use]
    pub fn get(&self, domain: Domain) -> Option<&Macaroon> {
        self.macaroons.get(&domain)
    }

    fn insert(&mut self, domain: Domain, macaroon: Macaroon) {
        self.macaroons.insert(domain, macaroon);
    }
}

/// Load every domain's macaroon from `locator`.
///
/// `readonly` is the already-loaded read-only macaroon; it enables the
/// read-only domain.
///
/// # Errors
///
/// Returns [`LndError::PermissionDenied`] if the core macaroon cannot be
/// loaded.
pub fn resolve(
    locator: &MacaroonLocator,
    readonly: &Macaroon,
) -> LndResult<(PermissionSet, MacaroonPouch)> {
    let mut perms = PermissionSet::default();
    let mut pouch = MacaroonPouch::default();

    perms.set(Domain::ReadOnly, true);
    pouch.insert(Domain::ReadOnly, readonly.clone());

    for domain in Domain::ALL {
        if domain == Domain::ReadOnly {
            continue;
        }

        match locator.load(domain) {
            Ok(mac) => {
                debug!(%domain, "Macaroon loaded");
                perms.set(domain, true);
                pouch.insert(domain, mac);
            },
            Err(e) if domain == Domain::Lightning => {
                return Err(LndError::PermissionDenied {
                    domain,
                    reason: e.to_string(),
                });
            },
            Err(e) => {
                info!(%domain, reason = %e, "Domain disabled, macaroon not available");
                perms.diagnostics.push((domain, e.to_string()));
            },
        }
    }

    Ok((perms, pouch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{macaroon_dir, test_macaroon};

    fn readonly() -> Macaroon {
        test_macaroon(Domain::ReadOnly)
    }

    #[test]
    fn domains_follow_available_macaroons() {
        let dir = tempfile::tempdir().unwrap();
        macaroon_dir(dir.path(), &[Domain::Lightning, Domain::Signer, Domain::Router]).unwrap();

        let locator = MacaroonLocator::Dir(dir.path().to_path_buf());
        let (perms, pouch) = resolve(&locator, &readonly()).unwrap();

        assert_eq!(
            perms.enabled_domains(),
            vec!["lightning", "router", "signer", "readonly"]
        );
        assert!(!perms.allows(Domain::WalletKit));
        assert_eq!(pouch.get(Domain::Signer), Some(&test_macaroon(Domain::Signer)));
        assert!(pouch.get(Domain::Invoices).is_none());

        let disabled: Vec<Domain> = perms.diagnostics().iter().map(|(d, _)| *d).collect();
        assert_eq!(
            disabled,
            vec![Domain::WalletKit, Domain::Invoices, Domain::ChainNotifier]
        );
    }

    #[test]
    fn disabled_domain_keeps_reason() {
        let dir = tempfile::tempdir().unwrap();
        macaroon_dir(dir.path(), &[Domain::Lightning]).unwrap();

        let locator = MacaroonLocator::Dir(dir.path().to_path_buf());
        let (perms, _) = resolve(&locator, &readonly()).unwrap();

        let (_, reason) = perms
            .diagnostics()
            .iter()
            .find(|(d, _)| *d == Domain::WalletKit)
            .unwrap();
        assert!(!perms.allows(Domain::WalletKit));
        assert!(reason.contains("walletkit.macaroon"), "{reason}");
    }

    #[test]
    fn missing_core_macaroon_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        macaroon_dir(dir.path(), &[Domain::WalletKit, Domain::Signer]).unwrap();

        let locator = MacaroonLocator::Dir(dir.path().to_path_buf());
        let err = resolve(&locator, &readonly()).unwrap_err();
        assert!(matches!(
            err,
            LndError::PermissionDenied {
                domain: Domain::Lightning,
                ..
            }
        ));
    }

    #[test]
    fn raw_macaroon_enables_everything() {
        let mac = Macaroon::from_bytes(vec![0xaa]);
        let locator = MacaroonLocator::Raw(mac.clone());

        let (perms, pouch) = resolve(&locator, &mac).unwrap();
        assert_eq!(perms.enabled_domains().len(), Domain::ALL.len());
        assert!(perms.diagnostics().is_empty());
        for domain in Domain::ALL {
            assert_eq!(pouch.get(domain), Some(&mac));
        }
    }

    #[test]
    fn single_file_applies_to_every_domain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.macaroon");
        std::fs::write(&path, [1, 2, 3]).unwrap();

        let (perms, _) = resolve(&MacaroonLocator::File(path), &readonly()).unwrap();
        assert!(Domain::ALL.into_iter().all(|d| perms.allows(d)));
    }
}
