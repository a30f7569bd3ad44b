use crate::common::message::{receive_buffer, take_payload};
use crate::common::{ConnectionState, DEFAULT_BUFFER_SIZE, Message, Received, Transport, TruncationPolicy};
use crate::endpoint::{Endpoint, Mode, SocketPath};
use crate::{EchoError, Operation, Result};
use async_trait::async_trait;
use socket2::Socket;
use std::io::{self, Read};
use std::net::Shutdown;
use tokio::io::unix::AsyncFd;
use tracing::debug;

/// One end of a seqpacket connection
///
/// Every `send` arrives as exactly one `recv` on the other side. A zero-length
/// read is the peer's orderly shutdown; it is reported once as
/// [`Received::Shutdown`], after which the connection is closed.
#[derive(Debug)]
pub struct SeqpacketConnection {
    inner: AsyncFd<Socket>,
    state: ConnectionState,
    buffer_size: usize,
    truncation: TruncationPolicy,
}

impl SeqpacketConnection {
    /// Connects to a seqpacket listener at `path`
    pub async fn connect(path: &SocketPath) -> Result<Self> {
        let endpoint = Endpoint::open(Mode::Seqpacket)?;
        endpoint.connect(path)?;
        let (socket, _) = endpoint.into_parts();
        Self::from_socket(socket, Operation::Connect)
    }

    pub(crate) fn from_socket(socket: Socket, op: Operation) -> Result<Self> {
        socket
            .set_nonblocking(true)
            .map_err(|source| EchoError::Io { op, source })?;
        let inner = AsyncFd::new(socket).map_err(|source| EchoError::Io { op, source })?;
        Ok(Self {
            inner,
            state: ConnectionState::Connected,
            buffer_size: DEFAULT_BUFFER_SIZE,
            truncation: TruncationPolicy::default(),
        })
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Sends `payload` as one message
    ///
    /// Empty payloads are refused: the peer could not tell them from shutdown.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        if payload.is_empty() {
            return Err(EchoError::SendFailed(io::Error::new(
                io::ErrorKind::InvalidInput,
                "zero-length seqpacket messages are indistinguishable from shutdown",
            )));
        }

        let result = loop {
            let mut guard = match self.inner.writable().await {
                Ok(guard) => guard,
                Err(e) => break Err(e),
            };
            match guard.try_io(|inner| inner.get_ref().send(payload)) {
                Ok(result) => break result,
                Err(_would_block) => continue,
            }
        };

        match result {
            Ok(sent) if sent == payload.len() => Ok(()),
            Ok(sent) => Err(EchoError::SendFailed(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("seqpacket accepted {sent} of {} bytes", payload.len()),
            ))),
            Err(e) => {
                self.state = ConnectionState::after_error(&e);
                Err(EchoError::SendFailed(e))
            }
        }
    }

    /// Waits for the next message or the peer's shutdown
    pub async fn recv(&mut self) -> Result<Received> {
        self.ensure_connected()?;
        let mut buffer = receive_buffer(self.buffer_size);

        let result = loop {
            let mut guard = match self.inner.readable().await {
                Ok(guard) => guard,
                Err(e) => break Err(e),
            };
            match guard.try_io(|inner| {
                let mut socket = inner.get_ref();
                socket.read(&mut buffer[..])
            }) {
                Ok(result) => break result,
                Err(_would_block) => continue,
            }
        };

        match result {
            Ok(0) => {
                debug!("Peer shut down seqpacket connection");
                self.state = ConnectionState::Closed;
                Ok(Received::Shutdown)
            }
            Ok(received) => {
                let payload = take_payload(buffer, received, self.buffer_size, self.truncation)?;
                Ok(Received::Message(Message::new(payload)))
            }
            Err(e) => {
                self.state = ConnectionState::after_error(&e);
                Err(EchoError::ReceiveFailed(e))
            }
        }
    }

    /// Half-closes the write side; the peer sees an orderly shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.inner
            .get_ref()
            .shutdown(Shutdown::Write)
            .map_err(EchoError::SendFailed)
    }

    pub fn close(self) {
        drop(self);
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Closed => Err(EchoError::Closed),
        }
    }
}

#[async_trait]
impl Transport for SeqpacketConnection {
    fn mode(&self) -> Mode {
        Mode::Seqpacket
    }

    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        SeqpacketConnection::send(self, payload).await
    }

    async fn recv(&mut self) -> Result<Received> {
        SeqpacketConnection::recv(self).await
    }
}
