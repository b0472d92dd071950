//! Opaque macaroon bearer tokens and where to find them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::{CredentialError, Domain};

/// A serialized macaroon. The bytes are opaque to this crate.
///
/// Cloning is cheap; the bytes are shared and wiped when the last clone drops.
#[derive(Clone)]
pub struct Macaroon(Arc<Zeroizing<Vec<u8>>>);

impl Macaroon {
    /// Wrap raw macaroon bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Arc::new(Zeroizing::new(bytes)))
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex encoding, as attached to every RPC request.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl fmt::Debug for Macaroon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Macaroon(<{} bytes>)", self.0.len())
    }
}

impl PartialEq for Macaroon {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Macaroon {}

/// Resolved location of the macaroon bundle.
#[derive(Debug, Clone)]
pub enum MacaroonLocator {
    /// One file per domain inside this directory.
    Dir(PathBuf),
    /// The same file for every domain.
    File(PathBuf),
    /// The same in-memory bytes for every domain.
    Raw(Macaroon),
}

impl MacaroonLocator {
    /// The file a domain's macaroon would be read from, if file-backed.
    #[must_use]
    pub fn path_for(&self, domain: Domain) -> Option<PathBuf> {
        match self {
            Self::Dir(dir) => Some(dir.join(domain.macaroon_filename())),
            Self::File(path) => Some(path.clone()),
            Self::Raw(_) => None,
        }
    }

    /// Load the macaroon for `domain`.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the file cannot be read or is empty.
    pub fn load(&self, domain: Domain) -> Result<Macaroon, CredentialError> {
        let path = match self {
            Self::Raw(mac) => return Ok(mac.clone()),
            Self::Dir(dir) => dir.join(domain.macaroon_filename()),
            Self::File(path) => path.clone(),
        };

        let bytes = std::fs::read(&path).map_err(|source| CredentialError::Read {
            what: "macaroon",
            path: path.clone(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(CredentialError::EmptyMacaroon(path));
        }
        Ok(Macaroon::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_per_domain_files_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("admin.macaroon"), [0x02, 0x01]).unwrap();

        let locator = MacaroonLocator::Dir(dir.path().to_path_buf());
        let mac = locator.load(Domain::Lightning).unwrap();
        assert_eq!(mac.as_bytes(), &[0x02, 0x01]);
        assert_eq!(mac.to_hex(), "0201");

        let err = locator.load(Domain::Router).unwrap_err();
        assert!(matches!(err, CredentialError::Read { .. }));
    }

    #[test]
    fn empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readonly.macaroon");
        std::fs::write(&path, []).unwrap();

        let err = MacaroonLocator::File(path).load(Domain::ReadOnly).unwrap_err();
        assert!(matches!(err, CredentialError::EmptyMacaroon(_)));
    }

    #[test]
    fn raw_applies_to_every_domain() {
        let locator = MacaroonLocator::Raw(Macaroon::from_bytes(vec![7; 4]));
        for domain in Domain::ALL {
            assert_eq!(locator.load(domain).unwrap().as_bytes(), &[7; 4]);
        }
    }

    #[test]
    fn debug_hides_bytes() {
        let mac = Macaroon::from_bytes(vec![0xab; 3]);
        assert_eq!(format!("{mac:?}"), "Macaroon(<3 bytes>)");
    }
}
