use super::StreamConnection;
use crate::common::{ConnectionConfig, DEFAULT_BUFFER_SIZE, Listener};
use crate::endpoint::{BoundPath, Endpoint, Mode, SocketPath};
use crate::{EchoError, Operation, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::net::UnixListener;
use tracing::debug;

/// A bound, listening stream socket
///
/// Bound through [`Endpoint`] rather than `UnixListener::bind` so the backlog
/// is configurable and stale socket files are handled the same way as for
/// the other modes.
#[derive(Debug)]
pub struct StreamListener {
    // Declared before `bound`: the handle closes before the file is removed.
    inner: UnixListener,
    bound: Option<BoundPath>,
    path: SocketPath,
    buffer_size: usize,
}

impl StreamListener {
    /// Binds `path` and starts listening with the given backlog
    pub async fn listen(path: &SocketPath, backlog: i32) -> Result<Self> {
        let mut endpoint = Endpoint::open(Mode::Stream)?;
        endpoint.bind(path)?;
        endpoint.listen(backlog)?;

        let (socket, bound) = endpoint.into_parts();
        let std_listener: std::os::unix::net::UnixListener = socket.into();
        let inner = UnixListener::from_std(std_listener).map_err(|source| EchoError::Io {
            op: Operation::Listen,
            source,
        })?;

        debug!(%path, backlog, "Stream listener ready");
        Ok(Self {
            inner,
            bound,
            path: path.clone(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Waits for the next pending connection
    pub async fn accept(&self) -> Result<StreamConnection> {
        let (stream, _peer) = self
            .inner
            .accept()
            .await
            .map_err(|e| EchoError::setup(Operation::Accept, Some(self.path.as_path()), e))?;
        Ok(StreamConnection::from_stream(stream).with_buffer_size(self.buffer_size))
    }

    pub fn local_path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn close(self) {
        debug!(path = %self.path, bound = self.bound.is_some(), "Closing stream listener");
        drop(self);
    }
}

#[async_trait]
impl Listener for StreamListener {
    type Connection = StreamConnection;

    async fn bind(config: &ConnectionConfig) -> Result<Self> {
        let path = config.socket_path()?;
        Ok(StreamListener::listen(&path, config.backlog)
            .await?
            .with_buffer_size(config.buffer_size))
    }

    async fn accept(&self) -> Result<Self::Connection> {
        StreamListener::accept(self).await
    }

    fn local_path(&self) -> &Path {
        StreamListener::local_path(self)
    }
}
