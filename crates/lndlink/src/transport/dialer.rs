//! Pluggable dialing of the raw byte stream under the TLS layer.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Default lnd RPC port, appended to addresses that carry none.
pub const DEFAULT_RPC_PORT: u16 = 10009;

/// A bidirectional byte stream.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// A boxed dialed stream.
pub type BoxedStream = Box<dyn AsyncStream>;

/// Opens the raw stream a connection runs over.
///
/// Substitute a custom dialer to reach the daemon over in-memory pipes,
/// proxies, or other non-TCP transports.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Dial `address`.
    async fn dial(&self, address: &str) -> io::Result<BoxedStream>;
}

/// Dials TCP `host:port` addresses and `unix:`/`unix://` socket paths.
#[derive(Debug, Clone, Copy)]
pub struct AddressDialer {
    default_port: u16,
}

impl AddressDialer {
    /// A dialer that appends `default_port` to addresses without a port.
    #[must_use]
    pub const fn new(default_port: u16) -> Self {
        Self { default_port }
    }
}

impl Default for AddressDialer {
    fn default() -> Self {
        Self::new(DEFAULT_RPC_PORT)
    }
}

#[async_trait]
impl Dialer for AddressDialer {
    async fn dial(&self, address: &str) -> io::Result<BoxedStream> {
        if let Some(path) = unix_socket_path(address) {
            debug!(path, "Dialing unix socket");
            return dial_unix(path).await;
        }

        let target = with_default_port(address, self.default_port);
        debug!(target = %target, "Dialing TCP");
        let stream = TcpStream::connect(target).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

#[cfg(unix)]
async fn dial_unix(path: &str) -> io::Result<BoxedStream> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    Ok(Box::new(stream))
}

#[cfg(not(unix))]
async fn dial_unix(path: &str) -> io::Result<BoxedStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("unix sockets are not supported on this platform: {path}"),
    ))
}

/// The socket path of a `unix:` or `unix://` address.
#[must_use]
pub fn unix_socket_path(address: &str) -> Option<&str> {
    address
        .strip_prefix("unix://")
        .or_else(|| address.strip_prefix("unix:"))
}

/// Split `address` into host and port, if it carries a port.
fn split_host_port(address: &str) -> Option<(&str, &str)> {
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return None;
    }
    // A bare IPv6 literal has colons but no brackets.
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return None;
    }
    Some((host, port))
}

/// `address` with `default_port` appended if it has no port.
#[must_use]
pub fn with_default_port(address: &str, default_port: u16) -> String {
    if split_host_port(address).is_some() {
        return address.to_string();
    }
    if address.contains(':') && !address.starts_with('[') {
        return format!("[{address}]:{default_port}");
    }
    format!("{address}:{default_port}")
}

/// Authority for the `WebSocket` handshake URL, with IPv6 hosts bracketed.
#[must_use]
pub fn handshake_authority(address: &str) -> String {
    if unix_socket_path(address).is_some() {
        return "localhost".to_string();
    }
    with_default_port(address, DEFAULT_RPC_PORT)
}

/// Host name the daemon's certificate is verified against.
#[must_use]
pub fn tls_server_name(address: &str) -> String {
    if unix_socket_path(address).is_some() {
        return "localhost".to_string();
    }
    let host = split_host_port(address).map_or(address, |(host, _)| host);
    host.trim_start_matches('[').trim_end_matches(']').to_string()
}
