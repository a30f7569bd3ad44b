//! Async Unix domain socket transports behind one echo service contract.
//!
//! Three delivery semantics are provided, each as its own type:
//!
//! - [`datagram::DatagramSocket`]: connectionless, boundary-preserving messages
//! - [`seqpacket::SeqpacketConnection`]: connection-oriented, boundary-preserving messages
//! - [`stream::StreamConnection`]: connection-oriented byte stream
//!
//! All of them implement [`common::Transport`], which is what
//! [`common::EchoService`] drives.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub use endpoint::Mode;

/// Socket operation that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Bind,
    Listen,
    Connect,
    Accept,
    Send,
    Receive,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Open => "open",
            Operation::Bind => "bind",
            Operation::Listen => "listen",
            Operation::Connect => "connect",
            Operation::Accept => "accept",
            Operation::Send => "send",
            Operation::Receive => "receive",
        };
        f.write_str(name)
    }
}

/// Error types for the udsecho library
#[derive(Error, Debug)]
pub enum EchoError {
    /// Socket handle creation failed
    #[error("failed to open {mode} socket: {source}")]
    ResourceExhausted {
        mode: Mode,
        #[source]
        source: std::io::Error,
    },

    /// Socket path is empty, too long or otherwise unusable
    #[error("invalid socket address {}: {reason}", path.display())]
    InvalidAddress { path: PathBuf, reason: String },

    /// Another live socket already owns the path
    #[error("socket path {} is already in use", path.display())]
    AddressInUse { path: PathBuf },

    /// The OS refused the operation for the current user
    #[error("permission denied during {op}: {source}")]
    PermissionDenied {
        op: Operation,
        #[source]
        source: std::io::Error,
    },

    /// No listener, backlog full, or path missing
    #[error("failed to connect to {}: {source}", path.display())]
    ConnectFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other failure of a setup operation (bind, listen, accept)
    #[error("{op} failed: {source}")]
    Io {
        op: Operation,
        #[source]
        source: std::io::Error,
    },

    /// Transmit failed (distinct from orderly shutdown)
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receive failed (distinct from orderly shutdown)
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A message did not fit the receive buffer and the policy rejects truncation
    #[error("message longer than {limit} bytes was truncated")]
    MessageTruncated { limit: usize },

    /// The peer closed the connection before the expected data arrived
    #[error("connection closed by peer")]
    PeerShutdown,

    /// The connection already reached its terminal state
    #[error("connection already closed")]
    Closed,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// UTF-8 encoding errors
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl EchoError {
    /// Maps an OS error from a setup operation into the error taxonomy
    pub(crate) fn setup(op: Operation, path: Option<&std::path::Path>, err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match (op, err.kind()) {
            (_, ErrorKind::PermissionDenied) => EchoError::PermissionDenied { op, source: err },
            (Operation::Bind, ErrorKind::AddrInUse) => EchoError::AddressInUse {
                path: path.map(PathBuf::from).unwrap_or_default(),
            },
            (Operation::Connect, _) => EchoError::ConnectFailed {
                path: path.map(PathBuf::from).unwrap_or_default(),
                source: err,
            },
            _ => EchoError::Io { op, source: err },
        }
    }

    /// Returns true for orderly-shutdown conditions rather than failures
    pub fn is_shutdown(&self) -> bool {
        matches!(self, EchoError::PeerShutdown | EchoError::Closed)
    }
}

/// Result type for the udsecho library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod common;
pub mod datagram;
pub mod endpoint;
pub mod seqpacket;
pub mod stream;

// Re-export main types for convenience
pub use common::{
    ClientConfig, ConnectionConfig, EchoClient, EchoServerTrait, EchoService, EchoSummary,
    Listener, Message, Received, Transport, TruncationPolicy,
};
pub use datagram::{DatagramConfig, DatagramEchoClient, DatagramEchoServer, DatagramSocket};
pub use endpoint::{Endpoint, SocketPath};
pub use seqpacket::{
    SeqpacketConnection, SeqpacketEchoClient, SeqpacketEchoServer, SeqpacketListener,
};
pub use stream::{StreamConnection, StreamEchoClient, StreamEchoServer, StreamListener};
