use crate::{EchoError, Result};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Longest socket path, in bytes, that fits `sockaddr_un.sun_path` together
/// with its NUL terminator (107 on Linux, 103 on the BSDs)
pub fn max_path_len() -> usize {
    // SAFETY: sockaddr_un is a plain C struct for which all-zero bytes is a valid value.
    let addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    addr.sun_path.len() - 1
}

/// Validated filesystem address of a Unix domain socket
///
/// Construction rejects paths the kernel would refuse or silently truncate,
/// so every `SocketPath` can be handed to `bind`/`connect`/`send_to` as is.
///
/// # Examples
///
/// ```
/// use udsecho::SocketPath;
///
/// let path = SocketPath::new("/tmp/echo.sock").unwrap();
/// assert_eq!(path.to_string(), "unix:/tmp/echo.sock");
///
/// let too_long = "/tmp/".to_string() + &"x".repeat(200);
/// assert!(SocketPath::new(too_long).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocketPath(PathBuf);

impl SocketPath {
    /// Validates `path` as a Unix socket address
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let len = path.as_os_str().as_bytes().len();

        if len == 0 {
            return Err(invalid(path, "path is empty".to_string()));
        }
        if path.as_os_str().as_bytes().contains(&0) {
            return Err(invalid(path, "path contains a NUL byte".to_string()));
        }
        let max = max_path_len();
        if len > max {
            return Err(invalid(path, format!("{len} bytes exceeds the {max} byte limit")));
        }

        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

fn invalid(path: PathBuf, reason: String) -> EchoError {
    EchoError::InvalidAddress { path, reason }
}

impl AsRef<Path> for SocketPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SocketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unix:{}", self.0.display())
    }
}

impl TryFrom<PathBuf> for SocketPath {
    type Error = EchoError;

    fn try_from(path: PathBuf) -> Result<Self> {
        Self::new(path)
    }
}

impl TryFrom<&Path> for SocketPath {
    type Error = EchoError;

    fn try_from(path: &Path) -> Result<Self> {
        Self::new(path)
    }
}

impl FromStr for SocketPath {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.strip_prefix("unix:").unwrap_or(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordinary_path() {
        let path = SocketPath::new("/tmp/udsecho.sock").unwrap();
        assert_eq!(path.as_path(), Path::new("/tmp/udsecho.sock"));
    }

    #[test]
    fn test_accepts_path_at_limit() {
        let max = max_path_len();
        let name = "/".to_string() + &"a".repeat(max - 1);
        assert_eq!(name.len(), max);
        assert!(SocketPath::new(name).is_ok());
    }

    #[test]
    fn test_rejects_path_over_limit() {
        let name = "/".to_string() + &"a".repeat(max_path_len());
        let err = SocketPath::new(name).unwrap_err();
        assert!(matches!(err, EchoError::InvalidAddress { .. }));
    }

    #[test]
    fn test_rejects_empty_and_nul() {
        assert!(matches!(
            SocketPath::new(""),
            Err(EchoError::InvalidAddress { .. })
        ));
        assert!(matches!(
            SocketPath::new("/tmp/a\0b"),
            Err(EchoError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_parse_and_display() {
        let path: SocketPath = "unix:/tmp/test.sock".parse().unwrap();
        assert_eq!(path.as_path(), Path::new("/tmp/test.sock"));
        assert_eq!(path.to_string(), "unix:/tmp/test.sock");

        let bare: SocketPath = "/tmp/test.sock".parse().unwrap();
        assert_eq!(bare, path);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_limit_is_107() {
        assert_eq!(max_path_len(), 107);
    }
}
