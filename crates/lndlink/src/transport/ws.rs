//! JSON-RPC over a TLS-secured `WebSocket`, built on `jsonrpsee`.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures::StreamExt;
use jsonrpsee::client_transport::ws::WsTransportClientBuilder;
use jsonrpsee::core::ClientError;
use jsonrpsee::core::client::{Client, ClientBuilder, ClientT, SubscriptionClientT};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::types::error::METHOD_NOT_FOUND_CODE;
use rustls::pki_types::ServerName;
use serde_json::Value;
use tokio_rustls::TlsConnector;
use tracing::debug;
use url::Url;

use super::channel::{RpcChannel, RpcError, RpcSubscription};
use super::connection::MAX_MSG_RECV_SIZE;
use super::dialer::{Dialer, handshake_authority, tls_server_name};
use crate::credentials::{Macaroon, TransportCredentials};

/// Name of the request parameter that carries the macaroon.
pub const MACAROON_PARAM: &str = "macaroon";

/// A `jsonrpsee` client running over a dialed, TLS-wrapped stream.
///
/// [`RpcChannel::close`] detaches the client. Requests already in flight
/// keep their own handle and finish first; the socket shuts down when the
/// last of them completes.
pub struct WsChannel {
    client: RwLock<Option<Arc<Client>>>,
}

impl WsChannel {
    /// Dial `address`, run the TLS and `WebSocket` handshakes, and start the
    /// JSON-RPC client.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if any step fails.
    pub async fn connect(
        address: &str,
        credentials: &TransportCredentials,
        dialer: &dyn Dialer,
    ) -> Result<Self, RpcError> {
        Self::connect_with_limit(address, credentials, dialer, MAX_MSG_RECV_SIZE).await
    }

    pub(crate) async fn connect_with_limit(
        address: &str,
        credentials: &TransportCredentials,
        dialer: &dyn Dialer,
        max_response_size: u32,
    ) -> Result<Self, RpcError> {
        let stream = dialer
            .dial(address)
            .await
            .map_err(|e| RpcError::Transport(format!("dial failed: {e}")))?;

        let host = tls_server_name(address);
        let server_name = ServerName::try_from(host.clone())
            .map_err(|e| RpcError::Transport(format!("invalid server name {host}: {e}")))?;
        let tls = TlsConnector::from(credentials.client_config())
            .connect(server_name, stream)
            .await
            .map_err(|e| RpcError::Transport(format!("TLS handshake failed: {e}")))?;
        debug!(host = %host, "TLS session established");

        // TLS is already terminated by the stream, so the handshake URL is
        // plain `ws` and only feeds the Host header.
        let url = handshake_url(address)?;

        let (sender, receiver) = WsTransportClientBuilder::default()
            .max_response_size(max_response_size)
            .build_with_stream(url, tls)
            .await
            .map_err(|e| RpcError::Transport(format!("WebSocket handshake failed: {e}")))?;

        let client = ClientBuilder::default().build_with_tokio(sender, receiver);
        Ok(Self {
            client: RwLock::new(Some(Arc::new(client))),
        })
    }

    fn client(&self) -> Result<Arc<Client>, RpcError> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RpcError::Closed)
    }
}

fn handshake_url(address: &str) -> Result<Url, RpcError> {
    let authority = handshake_authority(address);
    Url::parse(&format!("ws://{authority}/"))
        .map_err(|e| RpcError::Transport(format!("invalid address {address}: {e}")))
}

/// Build named parameters with the macaroon attached.
fn named_params(macaroon: &Macaroon, params: Value) -> Result<ObjectParams, RpcError> {
    let mut object = ObjectParams::new();
    object
        .insert(MACAROON_PARAM, macaroon.to_hex())
        .map_err(|e| RpcError::Decode(e.to_string()))?;

    match params {
        Value::Object(fields) => {
            for (name, value) in fields {
                object
                    .insert(&name, value)
                    .map_err(|e| RpcError::Decode(e.to_string()))?;
            }
        },
        Value::Null => {},
        other => {
            return Err(RpcError::Decode(format!(
                "request parameters must be an object, got {other}"
            )));
        },
    }
    Ok(object)
}

/// Map a `jsonrpsee` client error onto [`RpcError`].
fn map_client_error(method: &str, err: ClientError) -> RpcError {
    match err {
        ClientError::Call(obj) if obj.code() == METHOD_NOT_FOUND_CODE => RpcError::Unimplemented {
            method: method.to_string(),
        },
        ClientError::Call(obj) => RpcError::Status {
            code: obj.code(),
            message: obj.message().to_string(),
        },
        ClientError::RequestTimeout => RpcError::Timeout,
        ClientError::RestartNeeded(_) => RpcError::Closed,
        ClientError::ParseError(e) => RpcError::Decode(e.to_string()),
        other => RpcError::Transport(other.to_string()),
    }
}

#[async_trait]
impl RpcChannel for WsChannel {
    async fn call(
        &self,
        method: &str,
        macaroon: &Macaroon,
        params: Value,
    ) -> Result<Value, RpcError> {
        let params = named_params(macaroon, params)?;
        self.client()?
            .request::<Value, _>(method, params)
            .await
            .map_err(|e| map_client_error(method, e))
    }

    async fn subscribe(
        &self,
        method: &str,
        macaroon: &Macaroon,
        params: Value,
    ) -> Result<RpcSubscription, RpcError> {
        let params = named_params(macaroon, params)?;
        let unsubscribe = format!("{method}.unsubscribe");
        let subscription = self
            .client()?
            .subscribe::<Value, _>(method, params, &unsubscribe)
            .await
            .map_err(|e| map_client_error(method, e))?;

        Ok(subscription
            .map(|item| item.map_err(|e| RpcError::Decode(e.to_string())))
            .boxed())
    }

    async fn close(&self) {
        let client = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(client) = client {
            debug!(
                connected = client.is_connected(),
                in_flight = Arc::strong_count(&client).saturating_sub(1),
                "Closing JSON-RPC client"
            );
        }
    }
}
