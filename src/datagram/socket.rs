use super::DatagramConfig;
use crate::common::message::{receive_buffer, take_payload};
use crate::common::{Message, Received, Transport, TruncationPolicy};
use crate::endpoint::{BoundPath, Endpoint, Mode, SocketPath};
use crate::{EchoError, Operation, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::net::UnixDatagram;
use tracing::{debug, warn};

/// A Unix datagram socket, optionally bound to a path
///
/// Replies can only reach senders that are bound themselves, which is why
/// the echo clients always bind a return path.
#[derive(Debug)]
pub struct DatagramSocket {
    // Declared before `bound`: the handle closes before the file is removed.
    inner: UnixDatagram,
    bound: Option<BoundPath>,
    peer: Option<SocketPath>,
    buffer_size: usize,
    truncation: TruncationPolicy,
}

impl DatagramSocket {
    /// Binds a socket to `config.socket_path`
    pub fn from_config(config: &DatagramConfig) -> Result<Self> {
        let path = config.socket_path()?;
        Self::bind(&path, config)
    }

    /// Binds a socket to `path`, taking buffer settings from `config`
    pub fn bind(path: &SocketPath, config: &DatagramConfig) -> Result<Self> {
        let mut endpoint = Endpoint::open(Mode::Datagram)?;
        endpoint.bind(path)?;
        Self::from_endpoint(endpoint, config)
    }

    /// Creates a socket without a path; it can send but receives no replies
    pub fn unbound(config: &DatagramConfig) -> Result<Self> {
        let endpoint = Endpoint::open(Mode::Datagram)?;
        Self::from_endpoint(endpoint, config)
    }

    fn from_endpoint(endpoint: Endpoint, config: &DatagramConfig) -> Result<Self> {
        if config.buffer_size == 0 {
            return Err(EchoError::Config("buffer_size must be positive".into()));
        }
        let (socket, bound) = endpoint.into_parts();
        let std_socket: std::os::unix::net::UnixDatagram = socket.into();
        let inner = UnixDatagram::from_std(std_socket).map_err(|source| EchoError::Io {
            op: Operation::Open,
            source,
        })?;

        Ok(Self {
            inner,
            bound,
            peer: None,
            buffer_size: config.buffer_size,
            truncation: config.truncation,
        })
    }

    /// Fixes the default destination; datagrams from other senders are dropped by the kernel
    pub fn connect(&mut self, peer: &SocketPath) -> Result<()> {
        self.inner
            .connect(peer.as_path())
            .map_err(|e| EchoError::setup(Operation::Connect, Some(peer.as_path()), e))?;
        debug!(%peer, "Connected datagram socket");
        self.peer = Some(peer.clone());
        Ok(())
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.bound.as_ref().map(|bound| bound.path().as_path())
    }

    pub fn peer(&self) -> Option<&SocketPath> {
        self.peer.as_ref()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Transmits one message to `peer` as a single unit
    pub async fn send_to(&self, payload: &[u8], peer: &SocketPath) -> Result<()> {
        let sent = self
            .inner
            .send_to(payload, peer.as_path())
            .await
            .map_err(EchoError::SendFailed)?;
        check_sent(sent, payload.len())
    }

    /// Transmits one message to the connected peer
    pub async fn send(&self, payload: &[u8]) -> Result<()> {
        if self.peer.is_none() {
            return Err(EchoError::Config(
                "datagram socket has no default peer; use send_to".into(),
            ));
        }
        let sent = self.inner.send(payload).await.map_err(EchoError::SendFailed)?;
        check_sent(sent, payload.len())
    }

    /// Waits for one message and reports who sent it
    ///
    /// The sender is `None` when the peer's socket is not bound to a path.
    pub async fn recv_from(&self) -> Result<Message> {
        let mut buffer = receive_buffer(self.buffer_size);
        let (received, addr) = self
            .inner
            .recv_from(&mut buffer[..])
            .await
            .map_err(EchoError::ReceiveFailed)?;

        let sender = addr
            .as_pathname()
            .and_then(|path| SocketPath::new(path).ok())
            .or_else(|| self.peer.clone());
        let payload = take_payload(buffer, received, self.buffer_size, self.truncation)?;
        Ok(Message::from_sender(payload, sender))
    }

    /// Waits for one message from the connected peer
    pub async fn recv(&self) -> Result<Message> {
        let mut buffer = receive_buffer(self.buffer_size);
        let received = self
            .inner
            .recv(&mut buffer[..])
            .await
            .map_err(EchoError::ReceiveFailed)?;
        let payload = take_payload(buffer, received, self.buffer_size, self.truncation)?;
        Ok(Message::from_sender(payload, self.peer.clone()))
    }

    /// Releases the handle and removes the bound socket file
    pub fn close(self) {
        debug!(path = ?self.local_path(), "Closing datagram socket");
        drop(self);
    }
}

fn check_sent(sent: usize, expected: usize) -> Result<()> {
    if sent == expected {
        Ok(())
    } else {
        Err(EchoError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            format!("datagram accepted {sent} of {expected} bytes"),
        )))
    }
}

#[async_trait]
impl Transport for DatagramSocket {
    fn mode(&self) -> Mode {
        Mode::Datagram
    }

    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        DatagramSocket::send(self, payload).await
    }

    /// Datagram sockets never report shutdown
    async fn recv(&mut self) -> Result<Received> {
        self.recv_from().await.map(Received::Message)
    }

    async fn reply(&mut self, message: &Message) -> Result<()> {
        match (message.sender(), &self.peer) {
            (Some(sender), _) => self.send_to(message.payload(), sender).await,
            (None, Some(_)) => DatagramSocket::send(self, message.payload()).await,
            (None, None) => {
                warn!(size = message.len(), "Sender is unbound, dropping reply");
                Ok(())
            }
        }
    }
}
