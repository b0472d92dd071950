//! Network and version compatibility checks run right after connecting.
//!
//! Only the read-only macaroon is used here. Any failure closes the
//! connection before the error is returned, so a connection that has not
//! passed these checks never reaches a domain client.

use tracing::{info, warn};

use crate::clients::{LightningClient, VersionerClient};
use crate::credentials::Macaroon;
use crate::error::{LndError, LndResult};
use crate::network::Network;
use crate::transport::{Connection, ConnectionRef, RpcError};
use crate::version::VersionDescriptor;

/// Identity of a node that passed the compatibility checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    /// Node alias.
    pub alias: String,
    /// Compressed identity public key.
    pub pubkey: [u8; 33],
    /// Version the node reported.
    pub version: VersionDescriptor,
}

/// Check that the daemon behind `conn` runs on `network` and satisfies
/// `expected`.
///
/// # Errors
///
/// Returns [`LndError::NetworkMismatch`], [`LndError::VersionCheckUnavailable`],
/// [`LndError::VersionIncompatible`], [`LndError::MissingFeatureTags`], or
/// [`LndError::Rpc`]. The connection is closed in every error case.
pub async fn check_compatibility(
    conn: &Connection,
    readonly: &Macaroon,
    network: Network,
    expected: &VersionDescriptor,
) -> LndResult<NodeIdentity> {
    match check(conn.downgrade(), readonly, network, expected).await {
        Ok(identity) => {
            info!(
                alias = %identity.alias,
                version = %identity.version.short(),
                "Connected lnd node is compatible"
            );
            Ok(identity)
        },
        Err(err) => {
            warn!(address = conn.address(), error = %err, "lnd compatibility check failed");
            conn.close().await;
            Err(err)
        },
    }
}

async fn check(
    conn: ConnectionRef,
    readonly: &Macaroon,
    network: Network,
    expected: &VersionDescriptor,
) -> LndResult<NodeIdentity> {
    let lightning = LightningClient::new(conn.clone(), readonly.clone());
    let info = lightning
        .get_info()
        .await
        .map_err(|e| LndError::rpc("GetInfo", e))?;

    if info.network != network.as_str() {
        return Err(LndError::NetworkMismatch {
            expected: network.to_string(),
            actual: info.network,
        });
    }

    let versioner = VersionerClient::new(conn, readonly.clone());
    let version = check_version_compatibility(&versioner, expected).await?;

    Ok(NodeIdentity {
        alias: info.alias,
        pubkey: info.identity_pubkey,
        version,
    })
}

/// Query the daemon version and check it against `expected`.
///
/// # Errors
///
/// Returns [`LndError::VersionCheckUnavailable`] when the daemon predates
/// the version endpoint, otherwise see [`assert_version_compatible`].
pub async fn check_version_compatibility(
    client: &VersionerClient,
    expected: &VersionDescriptor,
) -> LndResult<VersionDescriptor> {
    let version = match client.get_version().await {
        Ok(version) => version,
        Err(RpcError::Unimplemented { .. }) => return Err(LndError::VersionCheckUnavailable),
        Err(e) => return Err(LndError::rpc("GetVersion", e)),
    };

    assert_version_compatible(&version, expected)?;
    Ok(version)
}

/// Check `actual` against the minimum `expected` version and its build tags.
///
/// # Errors
///
/// Returns [`LndError::VersionIncompatible`] or [`LndError::MissingFeatureTags`].
pub fn assert_version_compatible(
    actual: &VersionDescriptor,
    expected: &VersionDescriptor,
) -> LndResult<()> {
    if !actual.is_at_least(expected) {
        return Err(LndError::VersionIncompatible {
            required: expected.to_string(),
            actual: actual.short(),
        });
    }
    assert_build_tags_enabled(actual, expected)
}

/// Check that every build tag of `expected` is present in `actual`.
///
/// # Errors
///
/// Returns [`LndError::MissingFeatureTags`] naming the absent tags.
pub fn assert_build_tags_enabled(
    actual: &VersionDescriptor,
    expected: &VersionDescriptor,
) -> LndResult<()> {
    let missing = actual.missing_build_tags(&expected.build_tags);
    if missing.is_empty() {
        return Ok(());
    }
    Err(LndError::MissingFeatureTags {
        required: expected.to_string(),
        missing: missing.into_iter().map(String::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDaemon, info_response, scripted_node, version_response};

    fn readonly() -> Macaroon {
        Macaroon::from_bytes(b"readonly".to_vec())
    }

    #[test]
    fn version_ordering_examples() {
        let expected = VersionDescriptor::new(0, 11, 0);
        let check = |major, minor, patch| {
            assert_version_compatible(&VersionDescriptor::new(major, minor, patch), &expected)
        };

        assert!(check(0, 11, 0).is_ok());
        assert!(check(0, 11, 1).is_ok());
        assert!(check(1, 0, 0).is_ok());
        assert!(matches!(check(0, 10, 9), Err(LndError::VersionIncompatible { .. })));
        assert!(matches!(check(0, 9, 99), Err(LndError::VersionIncompatible { .. })));
    }

    #[test]
    fn build_tags_are_a_subset_test() {
        let expected = VersionDescriptor::new(0, 11, 0).with_build_tags(["signrpc", "walletrpc"]);

        let actual =
            VersionDescriptor::new(0, 11, 0).with_build_tags(["walletrpc", "signrpc", "chainrpc"]);
        assert!(assert_build_tags_enabled(&actual, &expected).is_ok());

        let actual = VersionDescriptor::new(0, 11, 0).with_build_tags(["walletrpc"]);
        match assert_build_tags_enabled(&actual, &expected) {
            Err(LndError::MissingFeatureTags { missing, .. }) => {
                assert_eq!(missing, vec!["signrpc".to_string()]);
            },
            other => panic!("expected missing tags, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn compatible_node_passes() {
        let daemon = scripted_node(Network::Regtest);
        let conn = Connection::new("mock", daemon.channel());

        let identity = check_compatibility(
            &conn,
            &readonly(),
            Network::Regtest,
            &VersionDescriptor::minimum_compatible(),
        )
        .await
        .unwrap();

        assert_eq!(identity.alias, "alice");
        assert_eq!(identity.version.minor, 17);
        assert!(!conn.is_closed());
        assert!(daemon.calls().iter().all(|c| c.macaroon == b"readonly"));
    }

    #[tokio::test]
    async fn network_mismatch_closes_connection() {
        let daemon = scripted_node(Network::Regtest);
        let conn = Connection::new("mock", daemon.channel());

        let err = check_compatibility(
            &conn,
            &readonly(),
            Network::Mainnet,
            &VersionDescriptor::minimum_compatible(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LndError::NetworkMismatch { ref actual, .. } if actual == "regtest"));
        assert!(conn.is_closed());
        assert_eq!(daemon.close_count(), 1);
        assert_eq!(daemon.call_count("verrpc.GetVersion"), 0);
    }

    #[tokio::test]
    async fn missing_version_endpoint_is_unavailable() {
        let daemon = MockDaemon::new();
        daemon.respond("lnrpc.GetInfo", info_response("testnet", true));
        let conn = Connection::new("mock", daemon.channel());

        let err = check_compatibility(
            &conn,
            &readonly(),
            Network::Testnet,
            &VersionDescriptor::minimum_compatible(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LndError::VersionCheckUnavailable));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn other_version_errors_stay_generic() {
        let daemon = MockDaemon::new();
        daemon.respond("lnrpc.GetInfo", info_response("testnet", true));
        daemon.fail("verrpc.GetVersion", RpcError::Timeout);
        let conn = Connection::new("mock", daemon.channel());

        let err = check_compatibility(
            &conn,
            &readonly(),
            Network::Testnet,
            &VersionDescriptor::minimum_compatible(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            LndError::Rpc {
                operation: "GetVersion",
                source: RpcError::Timeout
            }
        ));
    }

    #[tokio::test]
    async fn old_version_is_rejected() {
        let daemon = MockDaemon::new();
        daemon.respond("lnrpc.GetInfo", info_response("simnet", false));
        daemon.respond("verrpc.GetVersion", version_response(0, 10, 9, &["signrpc"]));
        let conn = Connection::new("mock", daemon.channel());

        let err = check_compatibility(
            &conn,
            &readonly(),
            Network::Simnet,
            &VersionDescriptor::minimum_compatible(),
        )
        .await
        .unwrap_err();

        match err {
            LndError::VersionIncompatible { required, actual } => {
                assert_eq!(actual, "v0.10.9-beta");
                assert!(required.starts_with("v0.11.0-beta"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(conn.is_closed());
    }
}
