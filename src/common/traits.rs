use super::config::ConnectionConfig;
use super::message::{Message, Received};
use crate::endpoint::Mode;
use crate::{EchoError, Result};
use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Lifecycle of a connection handle
///
/// A connection never returns to `Connected` once `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Closed,
}

impl ConnectionState {
    /// State of a connected handle after `error`
    ///
    /// Only errors that end the connection close it. A message the kernel
    /// refuses as too large leaves the connection usable.
    pub(crate) fn after_error(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero => ConnectionState::Closed,
            _ => ConnectionState::Connected,
        }
    }
}

/// Capability surface shared by every transport mode
///
/// Each mode keeps its own partial-I/O and boundary semantics; this trait only
/// names the operations the echo service needs.
#[async_trait]
pub trait Transport: Send {
    /// Delivery semantics of this transport
    fn mode(&self) -> Mode;

    /// Transmits `payload` to the connected peer
    async fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Waits for the next unit of data or the peer's orderly shutdown
    async fn recv(&mut self) -> Result<Received>;

    /// Sends `message`'s payload back to whoever sent it
    async fn reply(&mut self, message: &Message) -> Result<()> {
        self.send(message.payload()).await
    }
}

/// Listening side of a connection-oriented transport
#[async_trait]
pub trait Listener: Send + Sync + Sized + 'static {
    type Connection: Transport + 'static;

    /// Binds and starts listening according to `config`
    async fn bind(config: &ConnectionConfig) -> Result<Self>;

    /// Waits for the next peer; independent of connections accepted earlier
    async fn accept(&self) -> Result<Self::Connection>;

    fn local_path(&self) -> &Path;
}

/// Common trait for echo servers
pub trait EchoServerTrait {
    /// Binds the configured path and serves until shutdown or a fatal error
    async fn run(&self) -> Result<()>;

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()>;
}

/// Common trait for echo clients
pub trait EchoClient {
    /// Sends data to the echo server and returns the echoed response
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>>;

    /// Sends a string and returns the echoed string
    async fn echo_string(&mut self, data: &str) -> Result<String> {
        let response = self.echo(data.as_bytes()).await?;
        String::from_utf8(response).map_err(EchoError::Utf8)
    }
}
