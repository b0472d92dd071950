//! The single shared daemon connection and its non-owning references.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use super::channel::{RpcChannel, RpcError};
use super::dialer::Dialer;
use super::ws::WsChannel;
use crate::credentials::{Macaroon, TransportCredentials};
use crate::error::{LndError, LndResult};

/// Largest message the client accepts from the daemon (200 MiB).
pub const MAX_MSG_RECV_SIZE: u32 = 209_715_200;

struct ConnectionInner {
    address: String,
    channel: RwLock<Option<Arc<dyn RpcChannel>>>,
}

impl ConnectionInner {
    fn channel(&self) -> Result<Arc<dyn RpcChannel>, RpcError> {
        self.channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RpcError::Closed)
    }
}

/// Owning handle to the daemon connection.
///
/// Held by the service registry. Domain clients only ever see a
/// [`ConnectionRef`] and cannot close the connection.
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Wrap an established channel.
    pub fn new(address: impl Into<String>, channel: Arc<dyn RpcChannel>) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                address: address.into(),
                channel: RwLock::new(Some(channel)),
            }),
        }
    }

    /// Address the connection was opened to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Whether [`Connection::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner
            .channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// A non-owning reference for a domain client.
    #[must_use]
    pub fn downgrade(&self) -> ConnectionRef {
        ConnectionRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Close the connection. Only the first call has an effect.
    ///
    /// Returns whether this call closed the connection.
    pub(crate) async fn close(&self) -> bool {
        let channel = self
            .inner
            .channel
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match channel {
            Some(channel) => {
                debug!(address = %self.inner.address, "Closing lnd connection");
                channel.close().await;
                true
            },
            None => false,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.inner.address)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Non-owning reference to the daemon connection.
///
/// Calls fail with [`RpcError::Closed`] once the connection is closed or
/// its owner is gone.
#[derive(Clone)]
pub struct ConnectionRef {
    inner: Weak<ConnectionInner>,
}

impl ConnectionRef {
    fn channel(&self) -> Result<Arc<dyn RpcChannel>, RpcError> {
        self.inner.upgrade().ok_or(RpcError::Closed)?.channel()
    }

    /// Issue a typed request authorized by `macaroon`.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails or the response does not
    /// decode as `R`.
    pub async fn call<P, R>(&self, method: &str, macaroon: &Macaroon, params: &P) -> Result<R, RpcError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params).map_err(|e| RpcError::Decode(e.to_string()))?;
        let channel = self.channel()?;
        let response = channel.call(method, macaroon, params).await?;
        serde_json::from_value(response)
            .map_err(|e| RpcError::Decode(format!("{method} response: {e}")))
    }

    /// Open a typed notification stream authorized by `macaroon`.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the subscription cannot be opened.
    pub async fn subscribe<P, R>(
        &self,
        method: &str,
        macaroon: &Macaroon,
        params: &P,
    ) -> Result<BoxStream<'static, Result<R, RpcError>>, RpcError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        let params = serde_json::to_value(params).map_err(|e| RpcError::Decode(e.to_string()))?;
        let channel = self.channel()?;
        let stream = channel.subscribe(method, macaroon, params).await?;
        let method = method.to_string();
        Ok(stream
            .map(move |item| {
                item.and_then(|value: Value| {
                    serde_json::from_value(value)
                        .map_err(|e| RpcError::Decode(format!("{method} notification: {e}")))
                })
            })
            .boxed())
    }
}

/// Open the transport channel to `address` using `credentials` and `dialer`.
///
/// Identity, version and network are not validated here.
///
/// # Errors
///
/// Returns [`LndError::Transport`] if dialing or any handshake fails.
pub async fn establish(
    address: &str,
    credentials: &TransportCredentials,
    dialer: &dyn Dialer,
) -> LndResult<Connection> {
    info!(address, "Creating lnd connection");
    let channel = WsChannel::connect(address, credentials, dialer)
        .await
        .map_err(|e| LndError::Transport {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
    info!(address, "Connected to lnd");
    Ok(Connection::new(address, Arc::new(channel)))
}
