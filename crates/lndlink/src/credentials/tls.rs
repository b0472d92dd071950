//! TLS trust material for the daemon connection.

use std::fmt;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};
use tracing::debug;

use super::{CredentialError, DEFAULT_TLS_CERT_FILENAME, lnd_dir};
use crate::error::LndResult;

/// Where the daemon's TLS certificate comes from.
///
/// Raw PEM bytes take precedence over a path. With neither set, lnd's
/// default certificate location is used.
#[derive(Clone, Default)]
pub struct TlsSource {
    /// Path to a PEM certificate file.
    pub path: Option<PathBuf>,
    /// Raw PEM bytes.
    pub raw: Option<Vec<u8>>,
}

impl fmt::Debug for TlsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSource")
            .field("path", &self.path)
            .field("raw", &self.raw.as_ref().map(Vec::len))
            .finish()
    }
}

impl TlsSource {
    /// Load the certificate and build transport credentials.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LndError::CredentialLoad`] if the certificate cannot
    /// be read or parsed, and [`crate::LndError::Configuration`] if the
    /// default location cannot be determined.
    pub fn load(&self) -> LndResult<TransportCredentials> {
        if let Some(raw) = &self.raw {
            return Ok(TransportCredentials::from_pem(raw, "raw TLS bytes")?);
        }

        let path = match &self.path {
            Some(path) => path.clone(),
            None => lnd_dir()?.join(DEFAULT_TLS_CERT_FILENAME),
        };
        debug!(path = %path.display(), "Loading TLS certificate");

        let pem = std::fs::read(&path).map_err(|source| CredentialError::Read {
            what: "TLS certificate",
            path: path.clone(),
            source,
        })?;
        Ok(TransportCredentials::from_pem(
            &pem,
            &path.display().to_string(),
        )?)
    }
}

/// A TLS client configuration trusting the daemon's certificate.
#[derive(Clone)]
pub struct TransportCredentials {
    config: Arc<ClientConfig>,
}

impl fmt::Debug for TransportCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportCredentials").finish_non_exhaustive()
    }
}

impl TransportCredentials {
    /// Build credentials trusting every certificate in a PEM bundle.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the bundle is empty or a certificate
    /// is malformed.
    pub fn from_pem(pem: &[u8], origin: &str) -> Result<Self, CredentialError> {
        let mut roots = RootCertStore::empty();
        let mut reader = BufReader::new(pem);

        for cert in rustls_pemfile::certs(&mut reader) {
            let cert = cert.map_err(|e| CredentialError::InvalidCertificate {
                origin: origin.to_string(),
                reason: e.to_string(),
            })?;
            roots
                .add(cert)
                .map_err(|e| CredentialError::InvalidCertificate {
                    origin: origin.to_string(),
                    reason: e.to_string(),
                })?;
        }
        if roots.is_empty() {
            return Err(CredentialError::NoCertificates(origin.to_string()));
        }

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| CredentialError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// The TLS client configuration.
    #[must_use]
    pub fn client_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LndError;

    const TEST_CERT: &str = include_str!("../../testdata/tls.cert");

    #[test]
    fn raw_pem_builds_credentials() {
        let creds = TransportCredentials::from_pem(TEST_CERT.as_bytes(), "test");
        assert!(creds.is_ok());
    }

    #[test]
    fn empty_bundle_rejected() {
        let err = TransportCredentials::from_pem(b"not a certificate", "test").unwrap_err();
        assert!(matches!(err, CredentialError::NoCertificates(_)));
    }

    #[test]
    fn raw_bytes_take_precedence_over_path() {
        let source = TlsSource {
            path: Some(PathBuf::from("/nonexistent/tls.cert")),
            raw: Some(TEST_CERT.as_bytes().to_vec()),
        };
        assert!(source.load().is_ok());
    }

    #[test]
    fn missing_file_is_credential_error() {
        let source = TlsSource {
            path: Some(PathBuf::from("/nonexistent/tls.cert")),
            raw: None,
        };
        let err = source.load().unwrap_err();
        assert!(matches!(
            err,
            LndError::CredentialLoad(CredentialError::Read { .. })
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tls.cert");
        std::fs::write(&path, TEST_CERT).unwrap();

        let source = TlsSource {
            path: Some(path),
            raw: None,
        };
        assert!(source.load().is_ok());
    }
}
