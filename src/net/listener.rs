//! TCP listener for the front door.
//!
//! # Responsibilities
//! - Bind to the configured address at construction time
//! - Hand the socket to a runtime when the serve loop starts
//! - Accept one connection at a time

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A TCP socket bound eagerly but not yet tied to a runtime.
///
/// The front door runs on its own thread and runtime, so the tokio listener
/// is created there by [`Listener::activate`].
#[derive(Debug)]
pub struct Listener {
    inner: std::net::TcpListener,
}

impl Listener {
    /// Bind to `addr`.
    pub fn bind(addr: SocketAddr) -> Result<Self, ListenerError> {
        let inner = std::net::TcpListener::bind(addr).map_err(ListenerError::Bind)?;
        inner.set_nonblocking(true).map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %inner.local_addr().map_err(ListenerError::Bind)?,
            "Listener bound"
        );
        Ok(Self { inner })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Register with the current runtime. Must be called inside one.
    pub fn activate(self) -> Result<ActiveListener, ListenerError> {
        let inner = TcpListener::from_std(self.inner).map_err(ListenerError::Bind)?;
        Ok(ActiveListener { inner })
    }
}

/// A listener registered with a runtime.
pub struct ActiveListener {
    inner: TcpListener,
}

impl ActiveListener {
    /// Accept the next connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        tracing::debug!(peer_addr = %addr, "Connection accepted");
        Ok((stream, addr))
    }
}
