//! `signrpc` client for signing with node-held keys.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::credentials::Macaroon;
use crate::transport::{ConnectionRef, RpcError};

/// Identifies a key in the daemon's key ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLocator {
    /// Key family.
    #[serde(rename = "key_family")]
    pub family: i32,
    /// Index within the family.
    #[serde(rename = "key_index")]
    pub index: i32,
}

#[derive(Debug, Deserialize)]
struct SignMessageResponse {
    signature: String,
}

/// Client for the signer sub-server.
#[derive(Clone)]
pub struct SignerClient {
    conn: ConnectionRef,
    macaroon: Macaroon,
}

impl SignerClient {
    /// Create a client over `conn`.
    #[must_use]
    pub fn new(conn: ConnectionRef, macaroon: Macaroon) -> Self {
        Self { conn, macaroon }
    }

    /// Sign `msg` with the key at `locator`, returning the signature bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails or the signature is not hex.
    pub async fn sign_message(&self, msg: &[u8], locator: KeyLocator) -> Result<Vec<u8>, RpcError> {
        let resp: SignMessageResponse = self
            .conn
            .call(
                "signrpc.SignMessage",
                &self.macaroon,
                &json!({ "msg": hex::encode(msg), "key_loc": locator }),
            )
            .await?;
        hex::decode(&resp.signature).map_err(|e| RpcError::Decode(format!("signature: {e}")))
    }
}
