//! `walletrpc` client for the on-chain wallet.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::credentials::Macaroon;
use crate::transport::{ConnectionRef, RpcError};

/// Address kinds the wallet can derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressType {
    /// Native segwit v0 (p2wkh).
    #[default]
    WitnessPubkeyHash,
    /// Segwit nested in p2sh (np2wkh).
    NestedWitnessPubkeyHash,
    /// Segwit v1 (p2tr).
    TaprootPubkey,
}

#[derive(Debug, Deserialize)]
struct AddrResponse {
    addr: String,
}

/// Client for the wallet-kit sub-server.
#[derive(Clone)]
pub struct WalletKitClient {
    conn: ConnectionRef,
    macaroon: Macaroon,
}

impl WalletKitClient {
    /// Create a client over `conn`.
    #[must_use]
    pub fn new(conn: ConnectionRef, macaroon: Macaroon) -> Self {
        Self { conn, macaroon }
    }

    /// Derive the next unused address of the default account.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails.
    pub async fn next_addr(&self, address_type: AddressType) -> Result<String, RpcError> {
        let resp: AddrResponse = self
            .conn
            .call(
                "walletrpc.NextAddr",
                &self.macaroon,
                &json!({ "type": address_type, "change": false }),
            )
            .await?;
        Ok(resp.addr)
    }
}
