// Socket file ownership
//
// A bound Unix socket leaves an entry in the filesystem that the kernel never
// removes. The endpoint that created the entry owns it through a `BoundPath`
// and removes it exactly once when the guard is dropped. Leftovers from a
// crashed run are detected before binding: an entry nobody accepts
// connections on is stale and gets removed, while a live one is reported as
// `AddressInUse` instead of being stolen.

use super::{Mode, SocketPath};
use crate::{EchoError, Operation, Result};
use socket2::{Domain, SockAddr, Socket};
use std::io::ErrorKind;
use std::os::unix::fs::FileTypeExt;
use tracing::{debug, warn};

/// Guard that unlinks a socket file when dropped
#[derive(Debug)]
pub struct BoundPath {
    path: SocketPath,
}

impl BoundPath {
    pub(crate) fn new(path: SocketPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &SocketPath {
        &self.path
    }
}

impl Drop for BoundPath {
    fn drop(&mut self) {
        match std::fs::remove_file(self.path.as_path()) {
            Ok(()) => debug!(path = %self.path, "Removed socket file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path, error = %e, "Failed to remove socket file"),
        }
    }
}

enum Owner {
    Absent,
    Stale,
    Live,
}

/// Removes a leftover socket file at `path` if no live socket owns it
pub(crate) fn clear_stale(path: &SocketPath, mode: Mode) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path.as_path()) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(EchoError::setup(Operation::Bind, Some(path.as_path()), e)),
    };

    if !metadata.file_type().is_socket() {
        warn!(%path, "Refusing to replace a non-socket file");
        return Err(EchoError::AddressInUse {
            path: path.as_path().to_path_buf(),
        });
    }

    match check_owner(path, mode)? {
        Owner::Absent => Ok(()),
        Owner::Live => Err(EchoError::AddressInUse {
            path: path.as_path().to_path_buf(),
        }),
        Owner::Stale => match std::fs::remove_file(path.as_path()) {
            Ok(()) => {
                debug!(%path, "Removed stale socket file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EchoError::setup(Operation::Bind, Some(path.as_path()), e)),
        },
    }
}

// A non-blocking connect of the same socket type tells a stale file (refused)
// apart from a live owner (accepted, backlog full, or a different socket type).
// A live connection-oriented owner accepts one connection that is closed
// straight away and reads as an orderly shutdown.
fn check_owner(path: &SocketPath, mode: Mode) -> Result<Owner> {
    let open_err = |e| EchoError::setup(Operation::Bind, Some(path.as_path()), e);

    let socket = Socket::new(Domain::UNIX, mode.socket_type(), None).map_err(open_err)?;
    socket.set_nonblocking(true).map_err(open_err)?;
    let addr = SockAddr::unix(path.as_path()).map_err(open_err)?;

    match socket.connect(&addr) {
        Ok(()) => Ok(Owner::Live),
        Err(e) if e.kind() == ErrorKind::ConnectionRefused => Ok(Owner::Stale),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Owner::Absent),
        // a datagram owner connected to some other peer refuses with EPERM
        Err(e) if e.raw_os_error() == Some(libc::EPERM) => Ok(Owner::Live),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(EchoError::PermissionDenied {
            op: Operation::Bind,
            source: e,
        }),
        Err(e) => {
            debug!(%path, error = %e, "Socket file owner treated as live");
            Ok(Owner::Live)
        }
    }
}
