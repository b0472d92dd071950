//! `verrpc` client: the daemon's build version and tags.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::credentials::Macaroon;
use crate::transport::{ConnectionRef, RpcError};
use crate::version::VersionDescriptor;

#[derive(Debug, Deserialize)]
struct GetVersionResponse {
    app_major: u32,
    app_minor: u32,
    app_patch: u32,
    #[serde(default)]
    build_tags: Vec<String>,
    #[serde(default)]
    version: String,
    #[serde(default)]
    commit: String,
}

/// Client for the version endpoint. Needs only the read-only macaroon.
#[derive(Clone)]
pub struct VersionerClient {
    conn: ConnectionRef,
    macaroon: Macaroon,
}

impl VersionerClient {
    /// Create a client over `conn`.
    #[must_use]
    pub fn new(conn: ConnectionRef, macaroon: Macaroon) -> Self {
        Self { conn, macaroon }
    }

    /// Query the daemon's version and compiled-in build tags.
    ///
    /// Daemons that predate the endpoint fail with
    /// [`RpcError::Unimplemented`].
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails.
    pub async fn get_version(&self) -> Result<VersionDescriptor, RpcError> {
        let resp: GetVersionResponse = self
            .conn
            .call("verrpc.GetVersion", &self.macaroon, &json!({}))
            .await?;

        debug!(
            version = %resp.version,
            commit = %resp.commit,
            "Daemon version reported"
        );

        Ok(VersionDescriptor::new(resp.app_major, resp.app_minor, resp.app_patch)
            .with_build_tags(resp.build_tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDaemon, version_response};
    use crate::transport::Connection;

    #[tokio::test]
    async fn decodes_version() {
        let daemon = MockDaemon::new();
        daemon.respond("verrpc.GetVersion", version_response(0, 14, 2, &["signrpc", "walletrpc"]));
        let conn = Connection::new("mock", daemon.channel());
        let client = VersionerClient::new(conn.downgrade(), Macaroon::from_bytes(vec![1]));

        let version = client.get_version().await.unwrap();
        assert_eq!(
            version,
            VersionDescriptor::new(0, 14, 2).with_build_tags(["signrpc", "walletrpc"])
        );
    }

    #[tokio::test]
    async fn missing_endpoint_is_unimplemented() {
        let daemon = MockDaemon::new();
        let conn = Connection::new("mock", daemon.channel());
        let client = VersionerClient::new(conn.downgrade(), Macaroon::from_bytes(vec![1]));

        assert!(matches!(
            client.get_version().await,
            Err(RpcError::Unimplemented { .. })
        ));
    }
}
