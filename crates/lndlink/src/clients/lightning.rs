//! Main lightning RPC client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use super::decode_hex_array;
use crate::credentials::Macaroon;
use crate::shutdown::{BackgroundTasks, ShutdownHook};
use crate::sync::ChainSyncSource;
use crate::transport::{ConnectionRef, RpcError};

/// Static and dynamic information about the connected node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    /// Node alias.
    pub alias: String,
    /// Compressed identity public key.
    pub identity_pubkey: [u8; 33],
    /// Current best block height.
    pub block_height: u32,
    /// Whether the node is synced to its chain backend.
    pub synced_to_chain: bool,
    /// Network identifier, e.g. `regtest`.
    pub network: String,
}

#[derive(Debug, Deserialize)]
struct GetInfoResponse {
    alias: String,
    identity_pubkey: String,
    #[serde(default)]
    block_height: u32,
    #[serde(default)]
    synced_to_chain: bool,
    #[serde(default)]
    chains: Vec<Chain>,
}

#[derive(Debug, Deserialize)]
struct Chain {
    #[allow(dead_code)]
    chain: String,
    network: String,
}

impl TryFrom<GetInfoResponse> for Info {
    type Error = RpcError;

    fn try_from(resp: GetInfoResponse) -> Result<Self, Self::Error> {
        let identity_pubkey = decode_hex_array("identity_pubkey", &resp.identity_pubkey)?;
        let network = resp
            .chains
            .into_iter()
            .next()
            .map(|c| c.network)
            .ok_or_else(|| RpcError::Decode("GetInfo reported no chains".to_string()))?;

        Ok(Self {
            alias: resp.alias,
            identity_pubkey,
            block_height: resp.block_height,
            synced_to_chain: resp.synced_to_chain,
            network,
        })
    }
}

/// On-chain wallet balance in satoshis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    /// Confirmed balance.
    pub confirmed_balance: i64,
    /// Unconfirmed balance.
    pub unconfirmed_balance: i64,
}

/// A channel state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// Event type, e.g. `OPEN_CHANNEL` or `CLOSED_CHANNEL`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Funding outpoint of the affected channel.
    #[serde(default)]
    pub channel_point: Option<String>,
}

/// Client for the main lightning RPC, authorized by the admin macaroon.
#[derive(Clone)]
pub struct LightningClient {
    conn: ConnectionRef,
    macaroon: Macaroon,
    tasks: BackgroundTasks,
}

impl LightningClient {
    /// Create a client over `conn`.
    #[must_use]
    pub fn new(conn: ConnectionRef, macaroon: Macaroon) -> Self {
        Self {
            conn,
            macaroon,
            tasks: BackgroundTasks::new(),
        }
    }

    /// Query node identity and sync status.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails or the response is malformed.
    pub async fn get_info(&self) -> Result<Info, RpcError> {
        let resp: GetInfoResponse = self
            .conn
            .call("lnrpc.GetInfo", &self.macaroon, &json!({}))
            .await?;
        Info::try_from(resp)
    }

    /// Query the on-chain wallet balance.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails.
    pub async fn wallet_balance(&self) -> Result<WalletBalance, RpcError> {
        self.conn
            .call("lnrpc.WalletBalance", &self.macaroon, &json!({}))
            .await
    }

    /// Stream channel state changes until the services are closed.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the subscription cannot be opened.
    pub async fn subscribe_channel_events(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelEvent, RpcError>>, RpcError> {
        let stream = self
            .conn
            .subscribe("lnrpc.SubscribeChannelEvents", &self.macaroon, &json!({}))
            .await?;
        Ok(self.tasks.forward(stream))
    }

    /// Number of subscription tasks still running.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.tasks.active()
    }

    pub(crate) fn shutdown_hook(&self) -> Box<dyn ShutdownHook> {
        self.tasks.hook("lightning")
    }
}

#[async_trait]
impl ChainSyncSource for LightningClient {
    async fn synced_to_chain(&self) -> Result<bool, RpcError> {
        Ok(self.get_info().await?.synced_to_chain)
    }
}
