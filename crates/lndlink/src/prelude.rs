//! Commonly used types.
//!
//! ```rust
//! use lndlink::prelude::*;
//! ```

// Errors
pub use crate::{ErrorKind, LndError, LndResult, SyncWaitError};

// Bootstrap
pub use crate::{LndServices, ServicesConfig};

// Domain clients
pub use crate::clients::{
    ChainNotifierClient, InvoicesClient, LightningClient, RouterClient, SignerClient,
    VersionerClient, WalletKitClient,
};

// Credentials, network and version
pub use crate::{Domain, MacaroonSource, Network, TlsSource, VersionDescriptor};

// Sync
pub use crate::{SyncCancel, SyncMonitor, SyncState};
