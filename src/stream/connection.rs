use crate::common::{ConnectionState, DEFAULT_BUFFER_SIZE, Message, Received, Transport};
use crate::endpoint::{Endpoint, Mode, SocketPath};
use crate::{EchoError, Operation, Result};
use async_trait::async_trait;
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, trace};

/// One end of a byte-stream connection
///
/// A stream has no message boundaries: one `send` may arrive split over
/// several `recv` calls and several sends may arrive together.
#[derive(Debug)]
pub struct StreamConnection {
    inner: UnixStream,
    state: ConnectionState,
    buffer_size: usize,
}

impl StreamConnection {
    /// Connects to a stream listener at `path`
    pub async fn connect(path: &SocketPath) -> Result<Self> {
        let endpoint = Endpoint::open(Mode::Stream)?;
        endpoint.connect(path)?;
        let (socket, _) = endpoint.into_parts();
        let std_stream: std::os::unix::net::UnixStream = socket.into();
        let inner = UnixStream::from_std(std_stream).map_err(|source| EchoError::Io {
            op: Operation::Connect,
            source,
        })?;
        Ok(Self::from_stream(inner))
    }

    pub(crate) fn from_stream(inner: UnixStream) -> Self {
        Self {
            inner,
            state: ConnectionState::Connected,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Upper bound on the bytes a single `recv` returns
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Writes all of `payload`, resubmitting the remainder after partial writes
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        match write_fully(&mut self.inner, payload).await {
            Ok(writes) => {
                trace!(size = payload.len(), writes, "Stream send complete");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::after_error(&e);
                Err(EchoError::SendFailed(e))
            }
        }
    }

    /// Returns whatever bytes are available, up to the buffer size
    pub async fn recv(&mut self) -> Result<Received> {
        self.ensure_connected()?;
        let mut buffer = BytesMut::zeroed(self.buffer_size);

        match self.inner.read(&mut buffer[..]).await {
            Ok(0) => {
                debug!("Peer shut down stream connection");
                self.state = ConnectionState::Closed;
                Ok(Received::Shutdown)
            }
            Ok(received) => {
                buffer.truncate(received);
                Ok(Received::Message(Message::new(buffer.freeze())))
            }
            Err(e) => {
                self.state = ConnectionState::after_error(&e);
                Err(EchoError::ReceiveFailed(e))
            }
        }
    }

    /// Half-closes the write side; the peer reads end-of-stream
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(EchoError::SendFailed)
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

/// Issues single writes until `payload` is consumed and returns how many it took
///
/// A write that accepts zero bytes means the peer can take no more.
pub(crate) async fn write_fully<W>(writer: &mut W, payload: &[u8]) -> io::Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;
    let mut writes = 0;

    while written < payload.len() {
        match writer.write(&payload[written..]).await {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("stream accepted {written} of {} bytes", payload.len()),
                ));
            }
            Ok(n) => {
                written += n;
                writes += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(writes)
}

#[async_trait]
impl Transport for StreamConnection {
    fn mode(&self) -> Mode {
        Mode::Stream
    }

    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        StreamConnection::send(self, payload).await
    }

    async fn recv(&mut self) -> Result<Received> {
        StreamConnection::recv(self).await
    }
}
