//! Connection-oriented, boundary-preserving Unix seqpacket transport
//!
//! tokio has no seqpacket type, so the sockets are driven through
//! [`tokio::io::unix::AsyncFd`] over a `socket2::Socket`.

pub mod client;
pub mod connection;
pub mod listener;


pub use client::SeqpacketEchoClient;
pub use connection::SeqpacketConnection;
pub use listener::SeqpacketListener;

/// Echo server for seqpacket connections
pub type SeqpacketEchoServer = crate::common::ConnectionEchoServer<SeqpacketListener>;
