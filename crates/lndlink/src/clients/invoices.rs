//! `invoicesrpc` client for hold invoices.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use crate::credentials::Macaroon;
use crate::shutdown::{BackgroundTasks, ShutdownHook};
use crate::transport::{ConnectionRef, RpcError};

/// Lifecycle state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceState {
    /// Waiting for payment.
    Open,
    /// Paid and settled.
    Settled,
    /// Cancelled, no longer payable.
    Canceled,
    /// HTLCs accepted, waiting for settle or cancel.
    Accepted,
}

impl InvoiceState {
    /// Whether no further updates follow this state.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Settled | Self::Canceled)
    }
}

/// A state update of a single invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceUpdate {
    /// Payment hash identifying the invoice.
    pub hash: [u8; 32],
    /// New state.
    pub state: InvoiceState,
    /// Amount paid so far, in millisatoshis.
    pub amt_paid_msat: u64,
}

#[derive(Debug, Deserialize)]
struct InvoiceNotification {
    r_hash: String,
    state: InvoiceState,
    #[serde(default)]
    amt_paid_msat: u64,
}

impl TryFrom<InvoiceNotification> for InvoiceUpdate {
    type Error = RpcError;

    fn try_from(ntfn: InvoiceNotification) -> Result<Self, Self::Error> {
        Ok(Self {
            hash: super::decode_hex_array("r_hash", &ntfn.r_hash)?,
            state: ntfn.state,
            amt_paid_msat: ntfn.amt_paid_msat,
        })
    }
}

/// Client for hold-invoice management.
#[derive(Clone)]
pub struct InvoicesClient {
    conn: ConnectionRef,
    macaroon: Macaroon,
    tasks: BackgroundTasks,
}

impl InvoicesClient {
    /// Create a client over `conn`.
    #[must_use]
    pub fn new(conn: ConnectionRef, macaroon: Macaroon) -> Self {
        Self {
            conn,
            macaroon,
            tasks: BackgroundTasks::new(),
        }
    }

    /// Follow the state of the invoice with payment hash `hash`.
    ///
    /// The channel closes after the invoice reaches a final state.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the subscription cannot be opened.
    pub async fn subscribe_single_invoice(
        &self,
        hash: [u8; 32],
    ) -> Result<mpsc::Receiver<Result<InvoiceUpdate, RpcError>>, RpcError> {
        let stream = self
            .conn
            .subscribe::<_, InvoiceNotification>(
                "invoicesrpc.SubscribeSingleInvoice",
                &self.macaroon,
                &json!({ "r_hash": hex::encode(hash) }),
            )
            .await?;

        let updates = stream.map(|item| item.and_then(InvoiceUpdate::try_from));
        let updates = futures::stream::unfold((updates, false), |(mut updates, done)| async move {
            if done {
                return None;
            }
            let item = updates.next().await?;
            let done = matches!(&item, Ok(update) if update.state.is_final());
            Some((item, (updates, done)))
        })
        .boxed();
        Ok(self.tasks.forward(updates))
    }

    /// Settle an accepted hold invoice by revealing its preimage.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails.
    pub async fn settle_invoice(&self, preimage: [u8; 32]) -> Result<(), RpcError> {
        let _: serde_json::Value = self
            .conn
            .call(
                "invoicesrpc.SettleInvoice",
                &self.macaroon,
                &json!({ "preimage": hex::encode(preimage) }),
            )
            .await?;
        Ok(())
    }

    /// Cancel an open or accepted invoice.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails.
    pub async fn cancel_invoice(&self, hash: [u8; 32]) -> Result<(), RpcError> {
        let _: serde_json::Value = self
            .conn
            .call(
                "invoicesrpc.CancelInvoice",
                &self.macaroon,
                &json!({ "payment_hash": hex::encode(hash) }),
            )
            .await?;
        Ok(())
    }

    pub(crate) fn shutdown_hook(&self) -> Box<dyn ShutdownHook> {
        self.tasks.hook("invoices")
    }
}
