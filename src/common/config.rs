use crate::endpoint::SocketPath;
use crate::{EchoError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default application-level receive buffer, in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default bound on pending, not yet accepted connections
pub const DEFAULT_BACKLOG: i32 = 20;

/// What to do with a message longer than the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Surface the loss as `EchoError::MessageTruncated`
    #[default]
    Reject,
    /// Keep the first `buffer_size` bytes and log a warning
    Truncate,
}

/// Configuration for the listening side of the connection-oriented transports
///
/// # Examples
///
/// ```
/// use udsecho::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new("/tmp/echo.sock")
///     .with_backlog(5)
///     .with_max_connections(10)
///     .with_read_timeout(Some(Duration::from_secs(30)));
///
/// assert_eq!(config.backlog, 5);
/// assert_eq!(config.buffer_size, 8192);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Well-known path the listener binds to
    pub socket_path: PathBuf,
    /// Pending connection queue length passed to `listen`
    pub backlog: i32,
    /// Maximum number of concurrently served connections
    pub max_connections: usize,
    /// Receive buffer size per connection
    pub buffer_size: usize,
    /// Handling of seqpacket messages longer than `buffer_size`
    pub truncation: TruncationPolicy,
    /// Optional bound on each receive
    pub read_timeout: Option<Duration>,
    /// Optional bound on each reply
    pub write_timeout: Option<Duration>,
}

impl ConnectionConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            backlog: DEFAULT_BACKLOG,
            max_connections: 100,
            buffer_size: DEFAULT_BUFFER_SIZE,
            truncation: TruncationPolicy::default(),
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
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

    /// Validates the configuration and returns the listening address
    pub fn socket_path(&self) -> Result<SocketPath> {
        if self.buffer_size == 0 {
            return Err(EchoError::Config("buffer_size must be positive".into()));
        }
        if self.backlog < 0 {
            return Err(EchoError::Config("backlog must not be negative".into()));
        }
        if self.max_connections == 0 {
            return Err(EchoError::Config("max_connections must be positive".into()));
        }
        SocketPath::new(&self.socket_path)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("udsecho.sock"))
    }
}

/// Configuration for echo clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Receive buffer size
    pub buffer_size: usize,
    /// Handling of replies longer than `buffer_size`
    pub truncation: TruncationPolicy,
    /// Return-traffic path for datagram clients; generated when unset
    pub local_path: Option<PathBuf>,
    /// Optional bound on waiting for a reply
    pub read_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            truncation: TruncationPolicy::default(),
            local_path: None,
            read_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new("/tmp/builder.sock")
            .with_backlog(5)
            .with_max_connections(2)
            .with_buffer_size(4096)
            .with_truncation(TruncationPolicy::Truncate)
            .with_write_timeout(Some(Duration::from_secs(1)));

        assert_eq!(config.backlog, 5);
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.truncation, TruncationPolicy::Truncate);
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.write_timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::new("/tmp/defaults.sock");
        assert_eq!(config.backlog, DEFAULT_BACKLOG);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.truncation, TruncationPolicy::Reject);
        assert!(config.socket_path().is_ok());
    }

    #[test]
    fn test_connection_config_validation() {
        let config = ConnectionConfig::new("/tmp/zero.sock").with_buffer_size(0);
        assert!(matches!(config.socket_path(), Err(EchoError::Config(_))));

        let long = "/tmp/".to_string() + &"x".repeat(300);
        let config = ConnectionConfig::new(long);
        assert!(matches!(
            config.socket_path(),
            Err(EchoError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::default()
            .with_buffer_size(2048)
            .with_local_path("/tmp/client.sock")
            .with_read_timeout(Some(Duration::from_millis(500)));

        assert_eq!(config.buffer_size, 2048);
        assert_eq!(config.local_path, Some(PathBuf::from("/tmp/client.sock")));
        assert_eq!(config.read_timeout, Some(Duration::from_millis(500)));
    }
}
