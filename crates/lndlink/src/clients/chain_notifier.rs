//! `chainrpc` client streaming block epoch notifications.

use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use super::decode_hex_array;
use crate::credentials::Macaroon;
use crate::shutdown::{BackgroundTasks, ShutdownHook};
use crate::transport::{ConnectionRef, RpcError};

/// A newly connected block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEpoch {
    /// Block height.
    pub height: u32,
    /// Block hash, in the daemon's byte order.
    pub hash: [u8; 32],
}

#[derive(Debug, Deserialize)]
struct BlockEpochNotification {
    height: u32,
    hash: String,
}

impl TryFrom<BlockEpochNotification> for BlockEpoch {
    type Error = RpcError;

    fn try_from(ntfn: BlockEpochNotification) -> Result<Self, Self::Error> {
        Ok(Self {
            height: ntfn.height,
            hash: decode_hex_array("hash", &ntfn.hash)?,
        })
    }
}

/// Client for chain notifications.
#[derive(Clone)]
pub struct ChainNotifierClient {
    conn: ConnectionRef,
    macaroon: Macaroon,
    tasks: BackgroundTasks,
}

impl ChainNotifierClient {
    /// Create a client over `conn`.
    #[must_use]
    pub fn new(conn: ConnectionRef, macaroon: Macaroon) -> Self {
        Self {
            conn,
            macaroon,
            tasks: BackgroundTasks::new(),
        }
    }

    /// Receive a notification for every new block, starting with the
    /// current tip.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the subscription cannot be opened.
    pub async fn register_block_epoch_ntfn(
        &self,
    ) -> Result<mpsc::Receiver<Result<BlockEpoch, RpcError>>, RpcError> {
        let stream = self
            .conn
            .subscribe::<_, BlockEpochNotification>(
                "chainrpc.SubscribeBlockEpochs",
                &self.macaroon,
                &json!({}),
            )
            .await?;

        let epochs = stream
            .map(|item| item.and_then(BlockEpoch::try_from))
            .boxed();
        Ok(self.tasks.forward(epochs))
    }

    pub(crate) fn shutdown_hook(&self) -> Box<dyn ShutdownHook> {
        self.tasks.hook("chainnotifier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDaemon;
    use crate::transport::Connection;

    #[tokio::test]
    async fn block_epochs_are_decoded() {
        let daemon = MockDaemon::new();
        daemon.stream(
            "chainrpc.SubscribeBlockEpochs",
            vec![
                json!({"height": 100, "hash": "11".repeat(32)}),
                json!({"height": 101, "hash": "22".repeat(32)}),
            ],
        );
        let conn = Connection::new("mock", daemon.channel());
        let client = ChainNotifierClient::new(conn.downgrade(), Macaroon::from_bytes(vec![4]));

        let mut epochs = client.register_block_epoch_ntfn().await.unwrap();
        let first = epochs.recv().await.unwrap().unwrap();
        let second = epochs.recv().await.unwrap().unwrap();
        assert_eq!(first.height, 100);
        assert_eq!(second.hash, [0x22; 32]);

        client.shutdown_hook().shutdown().await;
        assert!(epochs.recv().await.is_none());
    }

    #[tokio::test]
    async fn bad_hash_ends_subscription() {
        let daemon = MockDaemon::new();
        daemon.stream(
            "chainrpc.SubscribeBlockEpochs",
            vec![json!({"height": 1, "hash": "zz"})],
        );
        let conn = Connection::new("mock", daemon.channel());
        let client = ChainNotifierClient::new(conn.downgrade(), Macaroon::from_bytes(vec![4]));

        let mut epochs = client.register_block_epoch_ntfn().await.unwrap();
        assert!(matches!(epochs.recv().await, Some(Err(RpcError::Decode(_)))));
        assert!(epochs.recv().await.is_none());
    }
}
