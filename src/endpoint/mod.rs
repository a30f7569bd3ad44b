//! Opened, optionally path-bound Unix socket handles
//!
//! An [`Endpoint`] is the common starting point of every transport: it owns
//! the OS socket for one [`Mode`] and, once bound, the socket file on disk.
//! Transports consume the endpoint and keep both for their own lifetime, so
//! the handle is closed and the file removed exactly once, on every exit path.

pub mod address;
pub mod bound_path;


pub use address::{SocketPath, max_path_len};
pub use bound_path::BoundPath;

use crate::{EchoError, Operation, Result};
use socket2::{Domain, SockAddr, Socket, Type};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Delivery semantics of a Unix domain socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Connectionless, boundary-preserving messages (`SOCK_DGRAM`)
    Datagram,
    /// Connection-oriented, boundary-preserving messages (`SOCK_SEQPACKET`)
    Seqpacket,
    /// Connection-oriented byte stream (`SOCK_STREAM`)
    Stream,
}

impl Mode {
    pub fn socket_type(self) -> Type {
        match self {
            Mode::Datagram => Type::DGRAM,
            Mode::Seqpacket => Type::SEQPACKET,
            Mode::Stream => Type::STREAM,
        }
    }

    pub fn is_connection_oriented(self) -> bool {
        !matches!(self, Mode::Datagram)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Datagram => f.write_str("datagram"),
            Mode::Seqpacket => f.write_str("seqpacket"),
            Mode::Stream => f.write_str("stream"),
        }
    }
}

impl FromStr for Mode {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dgram" | "datagram" => Ok(Mode::Datagram),
            "seqpacket" => Ok(Mode::Seqpacket),
            "stream" => Ok(Mode::Stream),
            other => Err(EchoError::Config(format!("unknown transport mode: {other}"))),
        }
    }
}

/// An opened Unix domain socket, optionally bound to a filesystem path
///
/// The socket is non-blocking and close-on-exec from the start so it can be
/// handed to the tokio reactor by the transport that consumes it.
///
/// # Examples
///
/// ```no_run
/// use udsecho::{Endpoint, Mode, SocketPath};
///
/// # fn main() -> udsecho::Result<()> {
/// let path = SocketPath::new("/tmp/udsecho-doc.sock")?;
/// let mut endpoint = Endpoint::open(Mode::Datagram)?;
/// endpoint.bind(&path)?;
/// assert!(path.as_path().exists());
///
/// endpoint.close();
/// assert!(!path.as_path().exists());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Endpoint {
    // Declared before `bound`: the handle closes before the file is removed.
    socket: Socket,
    mode: Mode,
    bound: Option<BoundPath>,
}

impl Endpoint {
    /// Allocates a socket for the given mode
    pub fn open(mode: Mode) -> Result<Self> {
        let socket = Socket::new(Domain::UNIX, mode.socket_type(), None)
            .and_then(|socket| socket.set_nonblocking(true).map(|()| socket))
            .map_err(|e| open_error(mode, e))?;

        debug!(%mode, "Opened endpoint");
        Ok(Self {
            socket,
            mode,
            bound: None,
        })
    }

    /// Binds the endpoint to `path`, clearing a stale socket file first
    pub fn bind(&mut self, path: &SocketPath) -> Result<()> {
        if let Some(bound) = &self.bound {
            return Err(EchoError::Config(format!(
                "endpoint is already bound to {}",
                bound.path()
            )));
        }

        bound_path::clear_stale(path, self.mode)?;

        let addr = sock_addr(path)?;
        self.socket
            .bind(&addr)
            .map_err(|e| EchoError::setup(Operation::Bind, Some(path.as_path()), e))?;
        self.bound = Some(BoundPath::new(path.clone()));

        debug!(%path, mode = %self.mode, "Bound endpoint");
        Ok(())
    }

    /// Marks a bound connection-oriented endpoint as accepting connections
    pub fn listen(&self, backlog: i32) -> Result<()> {
        if !self.mode.is_connection_oriented() {
            return Err(EchoError::Config(format!(
                "{} endpoints cannot listen",
                self.mode
            )));
        }
        if self.bound.is_none() {
            return Err(EchoError::Config("endpoint must be bound before listen".into()));
        }

        self.socket
            .listen(backlog)
            .map_err(|e| EchoError::setup(Operation::Listen, self.local_path(), e))
    }

    /// Connects to `path`, or fixes the default peer for a datagram endpoint
    ///
    /// The socket is non-blocking, so a full backlog fails immediately with
    /// `ConnectFailed` instead of waiting for room.
    pub fn connect(&self, path: &SocketPath) -> Result<()> {
        let addr = sock_addr(path)?;
        self.socket
            .connect(&addr)
            .map_err(|e| EchoError::setup(Operation::Connect, Some(path.as_path()), e))?;

        debug!(%path, mode = %self.mode, "Connected endpoint");
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Path this endpoint is bound to, if any
    pub fn local_path(&self) -> Option<&Path> {
        self.bound.as_ref().map(|bound| bound.path().as_path())
    }

    /// Releases the handle and removes the bound socket file
    pub fn close(self) {
        debug!(mode = %self.mode, path = ?self.local_path(), "Closing endpoint");
        drop(self);
    }

    pub(crate) fn into_parts(self) -> (Socket, Option<BoundPath>) {
        let Endpoint { socket, bound, .. } = self;
        (socket, bound)
    }
}

fn sock_addr(path: &SocketPath) -> Result<SockAddr> {
    SockAddr::unix(path.as_path()).map_err(|e| EchoError::InvalidAddress {
        path: path.as_path().to_path_buf(),
        reason: e.to_string(),
    })
}

fn open_error(mode: Mode, err: std::io::Error) -> EchoError {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        EchoError::PermissionDenied {
            op: Operation::Open,
            source: err,
        }
    } else {
        EchoError::ResourceExhausted { mode, source: err }
    }
}
