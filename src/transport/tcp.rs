//! TCP connection factory for both roles.
//!
//! # Example
//!
//! ```ignore
//! use framewire::transport::{open_as_receiver, open_as_sender};
//!
//! // Receiving side: bind, then accept exactly one peer.
//! let conn = open_as_receiver(Some("0.0.0.0"), 5000).await?;
//!
//! // Sending side:
//! let conn = open_as_sender("192.168.1.20", 5000).await?;
//! ```

use std::net::{IpAddr, SocketAddr};

use tokio::net::{lookup_host, TcpListener, TcpStream};

use super::connection::{Connection, Role};
use crate::error::{FramewireError, Result};

/// A connection over TCP.
pub type TcpConnection = Connection<TcpStream>;

/// Host resolved when no bind address is given.
const DEFAULT_BIND_HOST: &str = "localhost";

/// Listening socket that hands out one [`TcpConnection`] per accept.
pub struct FrameListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl FrameListener {
    /// Bind to `bind_address:port`.
    ///
    /// Without a bind address, binds the address `localhost` resolves to
    /// (IPv4 preferred). Port 0 picks a free port; see
    /// [`FrameListener::local_addr`].
    pub async fn bind(bind_address: Option<&str>, port: u16) -> Result<Self> {
        let ip = match bind_address {
            Some(address) => resolve(address, port)
                .await
                .map_err(|e| FramewireError::bind(format!("{}:{}", address, port), e))?,
            None => resolve(DEFAULT_BIND_HOST, port)
                .await
                .map_err(|e| FramewireError::bind(format!("{}:{}", DEFAULT_BIND_HOST, port), e))?,
        };
        let addr = SocketAddr::new(ip, port);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FramewireError::bind(addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| FramewireError::bind(addr, e))?;

        tracing::info!("Listening on {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept a single connection.
    pub async fn accept(&self) -> Result<TcpConnection> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;

        tracing::info!("Accepted connection from {}", peer);
        Ok(Connection::with_peer(stream, Role::Receiver, peer))
    }
}

/// Resolve `host` to one IP address, preferring IPv4.
async fn resolve(host: &str, port: u16) -> std::io::Result<IpAddr> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port)).await?.collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .map(|addr| addr.ip())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("{} did not resolve to any address", host),
            )
        })
}

/// Connect to the receiver at `address:port`.
///
/// Unreachable or refusing peers fail with `Connect`; nothing is retried.
pub async fn open_as_sender(address: &str, port: u16) -> Result<TcpConnection> {
    let stream = TcpStream::connect((address, port))
        .await
        .map_err(|e| FramewireError::connect(format!("{}:{}", address, port), e))?;
    stream.set_nodelay(true)?;
    let peer = stream.peer_addr()?;

    tracing::info!("Connected to {}", peer);
    Ok(Connection::with_peer(stream, Role::Sender, peer))
}

/// Bind on `bind_address:port` and accept exactly one sender.
///
/// The listening socket is released once the connection is accepted.
pub async fn open_as_receiver(bind_address: Option<&str>, port: u16) -> Result<TcpConnection> {
    let listener = FrameListener::bind(bind_address, port).await?;
    listener.accept().await
}
