//! The RPC channel seam between domain clients and the wire.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

use crate::credentials::Macaroon;

/// Failures of a single RPC exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The daemon does not implement the method.
    #[error("method {method} is not implemented by the daemon")]
    Unimplemented {
        /// Method that was called.
        method: String,
    },

    /// The daemon answered with an error status.
    #[error("daemon returned error {code}: {message}")]
    Status {
        /// JSON-RPC error code.
        code: i32,
        /// Error message from the daemon.
        message: String,
    },

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The connection has been closed.
    #[error("connection closed")]
    Closed,

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request or response could not be (de)serialized.
    #[error("malformed message: {0}")]
    Decode(String),
}

/// Stream of raw notifications from a server-side subscription.
pub type RpcSubscription = BoxStream<'static, Result<Value, RpcError>>;

/// A request/response and subscription channel to the daemon.
///
/// Implementations attach `macaroon` to each request. `params` is always a
/// JSON object of named parameters.
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Issue a single request and wait for its response.
    async fn call(&self, method: &str, macaroon: &Macaroon, params: Value)
    -> Result<Value, RpcError>;

    /// Open a server-side notification stream.
    async fn subscribe(
        &self,
        method: &str,
        macaroon: &Macaroon,
        params: Value,
    ) -> Result<RpcSubscription, RpcError>;

    /// Release the underlying transport.
    ///
    /// Requests already in flight may still complete. Every call or
    /// subscribe issued afterwards fails with [`RpcError::Closed`].
    async fn close(&self);
}
