//! Transport: dialing, TLS, the JSON-RPC channel, and the shared connection.

mod channel;
mod connection;
mod dialer;
mod ws;

pub use channel::{RpcChannel, RpcError, RpcSubscription};
pub use connection::{Connection, ConnectionRef, MAX_MSG_RECV_SIZE, establish};
pub use dialer::{
    AddressDialer, AsyncStream, BoxedStream, DEFAULT_RPC_PORT, Dialer, handshake_authority,
    tls_server_name, unix_socket_path, with_default_port,
};
pub use ws::{MACAROON_PARAM, WsChannel};
