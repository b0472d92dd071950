//! Domain clients.
//!
//! Each client holds a non-owning [`ConnectionRef`](crate::transport::ConnectionRef)
//! and the macaroon for its own domain. Clients are thin passthroughs; the
//! daemon does the work.

mod chain_notifier;
mod invoices;
mod lightning;
mod router;
mod signer;
mod versioner;
mod wallet_kit;

pub use chain_notifier::{BlockEpoch, ChainNotifierClient};
pub use invoices::{InvoiceState, InvoiceUpdate, InvoicesClient};
pub use lightning::{ChannelEvent, Info, LightningClient, WalletBalance};
pub use router::{RouteFeeEstimate, RouterClient};
pub use signer::{KeyLocator, SignerClient};
pub use versioner::VersionerClient;
pub use wallet_kit::{AddressType, WalletKitClient};

use crate::transport::RpcError;

/// Decode a hex string into a fixed-size array.
pub(crate) fn decode_hex_array<const N: usize>(field: &str, value: &str) -> Result<[u8; N], RpcError> {
    let bytes = hex::decode(value).map_err(|e| RpcError::Decode(format!("{field}: {e}")))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        RpcError::Decode(format!(
            "{field}: expected {N} bytes, got {}",
            bytes.len()
        ))
    })
}
