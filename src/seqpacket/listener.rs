use super::SeqpacketConnection;
use crate::common::{ConnectionConfig, DEFAULT_BUFFER_SIZE, Listener, TruncationPolicy};
use crate::endpoint::{BoundPath, Endpoint, Mode, SocketPath};
use crate::{EchoError, Operation, Result};
use async_trait::async_trait;
use socket2::Socket;
use std::path::Path;
use tokio::io::unix::AsyncFd;
use tracing::debug;

/// A bound, listening seqpacket socket
///
/// Dropping the listener closes it and removes its socket file.
#[derive(Debug)]
pub struct SeqpacketListener {
    // Declared before `bound`: the handle closes before the file is removed.
    inner: AsyncFd<Socket>,
    bound: Option<BoundPath>,
    path: SocketPath,
    buffer_size: usize,
    truncation: TruncationPolicy,
}

impl SeqpacketListener {
    /// Binds `path` and starts listening with the given backlog
    pub async fn listen(path: &SocketPath, backlog: i32) -> Result<Self> {
        let mut endpoint = Endpoint::open(Mode::Seqpacket)?;
        endpoint.bind(path)?;
        endpoint.listen(backlog)?;

        let (socket, bound) = endpoint.into_parts();
        let inner = AsyncFd::new(socket).map_err(|source| EchoError::Io {
            op: Operation::Listen,
            source,
        })?;

        debug!(%path, backlog, "Seqpacket listener ready");
        Ok(Self {
            inner,
            bound,
            path: path.clone(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            truncation: TruncationPolicy::default(),
        })
    }

    /// Receive buffer size handed to accepted connections
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    /// Waits for the next pending connection
    pub async fn accept(&self) -> Result<SeqpacketConnection> {
        let socket = loop {
            let mut guard = self.inner.readable().await.map_err(|source| EchoError::Io {
                op: Operation::Accept,
                source,
            })?;
            match guard.try_io(|inner| inner.get_ref().accept()) {
                Ok(Ok((socket, _peer))) => break socket,
                Ok(Err(e)) => return Err(EchoError::setup(Operation::Accept, Some(self.local_path()), e)),
                Err(_would_block) => continue,
            }
        };

        Ok(SeqpacketConnection::from_socket(socket, Operation::Accept)?
            .with_buffer_size(self.buffer_size)
            .with_truncation(self.truncation))
    }

    pub fn local_path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn close(self) {
        debug!(path = %self.path, bound = self.bound.is_some(), "Closing seqpacket listener");
        drop(self);
    }
}

#[async_trait]
impl Listener for SeqpacketListener {
    type Connection = SeqpacketConnection;

    async fn bind(config: &ConnectionConfig) -> Result<Self> {
        let path = config.socket_path()?;
        Ok(SeqpacketListener::listen(&path, config.backlog)
            .await?
            .with_buffer_size(config.buffer_size)
            .with_truncation(config.truncation))
    }

    async fn accept(&self) -> Result<Self::Connection> {
        SeqpacketListener::accept(self).await
    }

    fn local_path(&self) -> &Path {
        SeqpacketListener::local_path(self)
    }
}
