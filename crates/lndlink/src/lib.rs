//! Authenticated bootstrap client for lnd node daemons.
//!
//! Bootstrapping runs these stages in order, and any failure aborts the
//! rest:
//! - resolve TLS trust material and the macaroon bundle
//! - open a TLS-secured JSON-RPC connection through a pluggable [`Dialer`]
//! - check network, version and build tags with the read-only macaroon
//! - resolve which domains the macaroons grant access to
//! - activate the permitted domain clients
//! - optionally wait until the node is synced to chain
//!
//! ```rust,no_run
//! use lndlink::prelude::*;
//!
//! # async fn run() -> LndResult<()> {
//! let config = ServicesConfig::new("localhost:10009", Network::Regtest)
//!     .with_macaroon_dir("/home/lnd/.lnd/data/chain/bitcoin/regtest");
//! let services = LndServices::connect(&config).await?;
//! println!("connected to {}", services.node_alias());
//! services.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod clients;
pub mod compat;
pub mod credentials;
pub mod error;
pub mod network;
pub mod permissions;
pub mod services;
pub mod shutdown;
pub mod sync;
pub mod transport;
pub mod version;

#[cfg(feature = "config")]
mod config_bridge;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use compat::NodeIdentity;
pub use credentials::{CredentialError, Domain, Macaroon, MacaroonSource, TlsSource};
pub use error::{ErrorKind, LndError, LndResult, SyncWaitError};
pub use network::{ChainParams, Network};
pub use permissions::PermissionSet;
pub use services::{LndServices, ServicesConfig};
pub use shutdown::ShutdownHook;
pub use sync::{SyncCancel, SyncHandle, SyncMonitor, SyncState};
pub use transport::{Dialer, MAX_MSG_RECV_SIZE, RpcError};
pub use version::{VersionDescriptor, VersionParseError};
