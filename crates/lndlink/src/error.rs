//! Bootstrap error types.
//!
//! Every stage of the bootstrap maps its failures onto [`LndError`]. The
//! variants are grouped by [`ErrorKind`] so callers can tell a configuration
//! mistake from a transient network problem from a genuine incompatibility.

use std::time::Duration;

use thiserror::Error;

use crate::credentials::{CredentialError, Domain};
use crate::transport::RpcError;

/// Errors that can abort the bootstrap of an lnd connection.
#[derive(Debug, Error)]
pub enum LndError {
    /// Conflicting or invalid credential source selection.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// TLS or macaroon material could not be read or parsed.
    #[error("unable to load credentials: {0}")]
    CredentialLoad(#[from] CredentialError),

    /// The transport channel could not be opened.
    #[error("unable to connect to RPC server at {address}: {reason}")]
    Transport {
        /// Address that was dialed.
        address: String,
        /// Underlying failure.
        reason: String,
    },

    /// An RPC issued during bootstrap failed.
    #[error("{operation} failed: {source}")]
    Rpc {
        /// The bootstrap operation that issued the call.
        operation: &'static str,
        /// Underlying RPC failure.
        #[source]
        source: RpcError,
    },

    /// The daemon runs on a different network than configured.
    #[error("network mismatch with connected lnd node, wanted '{expected}', got '{actual}'")]
    NetworkMismatch {
        /// Configured network.
        expected: String,
        /// Network reported by the daemon.
        actual: String,
    },

    /// The daemon predates the version endpoint.
    #[error("version check not implemented, need minimum lnd version of v0.10.0-beta")]
    VersionCheckUnavailable,

    /// The daemon version is lower than the required minimum.
    #[error("version incompatible: at least version \"{required}\" is required, got \"{actual}\"")]
    VersionIncompatible {
        /// Minimum required version.
        required: String,
        /// Version reported by the daemon.
        actual: String,
    },

    /// The daemon lacks one or more required build tags.
    #[error("build tags missing: {} (at least version \"{required}\" is required)", .missing.join(","))]
    MissingFeatureTags {
        /// Minimum required version, including its tags.
        required: String,
        /// Required tags absent from the daemon.
        missing: Vec<String>,
    },

    /// The macaroon for a mandatory domain could not be resolved.
    #[error("permission denied for {domain} client: {reason}, please use a different macaroon")]
    PermissionDenied {
        /// Domain that is not accessible.
        domain: Domain,
        /// Why the domain is not accessible.
        reason: String,
    },

    /// Waiting for chain synchronization failed or was cancelled.
    #[error("error waiting for chain to be synced: {0}")]
    SyncWaitFailed(#[from] SyncWaitError),
}

/// Why a chain-sync wait ended without the node being synced.
#[derive(Debug, Error)]
pub enum SyncWaitError {
    /// A status poll failed.
    #[error("error in GetInfo call: {0}")]
    Poll(#[source] RpcError),

    /// A single status poll exceeded its per-call timeout.
    #[error("GetInfo call timed out after {0:?}")]
    PollTimeout(Duration),

    /// The wait was cancelled between polls.
    #[error("chain sync wait cancelled: {reason}")]
    Cancelled {
        /// Why the canceller stopped the wait.
        reason: String,
    },

    /// The monitor task ended without reporting an outcome.
    #[error("chain sync monitor stopped unexpectedly")]
    MonitorGone,
}

/// Coarse classification of an [`LndError`], for choosing a corrective action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fix the local configuration or credentials.
    Configuration,
    /// The network or daemon misbehaved; retrying may help.
    Transient,
    /// The daemon cannot serve this client; upgrade or reconfigure the daemon.
    Incompatible,
}

impl LndError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::CredentialLoad(_) | Self::PermissionDenied { .. } => {
                ErrorKind::Configuration
            },
            Self::Transport { .. } | Self::Rpc { .. } | Self::SyncWaitFailed(_) => {
                ErrorKind::Transient
            },
            Self::NetworkMismatch { .. }
            | Self::VersionCheckUnavailable
            | Self::VersionIncompatible { .. }
            | Self::MissingFeatureTags { .. } => ErrorKind::Incompatible,
        }
    }

    pub(crate) fn rpc(operation: &'static str, source: RpcError) -> Self {
        Self::Rpc { operation, source }
    }
}

/// Result type for bootstrap operations.
pub type LndResult<T> = Result<T, LndError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_separate_configuration_from_incompatibility() {
        let config = LndError::Configuration("both set".to_string());
        assert_eq!(config.kind(), ErrorKind::Configuration);

        let transient = LndError::Transport {
            address: "localhost:10009".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(transient.kind(), ErrorKind::Transient);

        assert_eq!(
            LndError::VersionCheckUnavailable.kind(),
            ErrorKind::Incompatible
        );
    }

    #[test]
    fn missing_tags_display_lists_tags() {
        let err = LndError::MissingFeatureTags {
            required: "v0.11.0-beta".to_string(),
            missing: vec!["signrpc".to_string(), "chainrpc".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "build tags missing: signrpc,chainrpc (at least version \"v0.11.0-beta\" is required)"
        );
    }

    #[test]
    fn sync_wait_error_wraps_cancellation() {
        let err = LndError::from(SyncWaitError::Cancelled {
            reason: "interrupted".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "error waiting for chain to be synced: chain sync wait cancelled: interrupted"
        );
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LndError>();
    }
}
