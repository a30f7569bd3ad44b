use crate::common::{ClientConfig, DEFAULT_BUFFER_SIZE, TruncationPolicy};
use crate::endpoint::SocketPath;
use crate::{EchoError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for datagram sockets and the datagram echo server
///
/// # Examples
///
/// ```
/// use udsecho::{DatagramConfig, TruncationPolicy};
///
/// let config = DatagramConfig::new("/tmp/echo-dgram.sock")
///     .with_buffer_size(1024)
///     .with_truncation(TruncationPolicy::Truncate);
///
/// assert_eq!(config.buffer_size, 1024);
/// assert!(config.read_timeout.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct DatagramConfig {
    /// Path the socket binds to
    pub socket_path: PathBuf,
    /// Largest message accepted without truncation
    pub buffer_size: usize,
    /// Handling of messages longer than `buffer_size`
    pub truncation: TruncationPolicy,
    /// Idle bound on waiting for the next datagram; the server logs and keeps going
    pub read_timeout: Option<Duration>,
    /// Bound on each reply
    pub write_timeout: Option<Duration>,
}

impl DatagramConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            truncation: TruncationPolicy::default(),
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Validates the configuration and returns the bind address
    pub fn socket_path(&self) -> Result<SocketPath> {
        if self.buffer_size == 0 {
            return Err(EchoError::Config("buffer_size must be positive".into()));
        }
        SocketPath::new(&self.socket_path)
    }

    /// Socket settings for a client returning traffic on `local_path`
    pub(crate) fn for_client(local_path: PathBuf, client: &ClientConfig) -> Self {
        Self::new(local_path)
            .with_buffer_size(client.buffer_size)
            .with_truncation(client.truncation)
            .with_read_timeout(client.read_timeout)
    }
}

impl Default for DatagramConfig {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("udsecho-dgram.sock"))
    }
}
