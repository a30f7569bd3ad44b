//! Common traits and types used across the udsecho library
//!
//! This module contains the transport-agnostic pieces: the [`Transport`] and
//! [`Listener`] traits, the [`EchoService`] loop, the generic connection
//! server, and the configuration shared by every mode.

pub mod config;
pub mod connection_server;
pub mod echo;
pub mod message;
pub(crate) mod shutdown;
pub mod test_utils;
pub mod traits;

pub use config::{ClientConfig, ConnectionConfig, DEFAULT_BACKLOG, DEFAULT_BUFFER_SIZE, TruncationPolicy};
pub use connection_server::ConnectionEchoServer;
pub use echo::{EchoService, EchoSummary};
pub use message::{Message, Received};
pub use test_utils::{TestServer, spawn_connection_server, spawn_datagram_server};
pub use traits::{ConnectionState, EchoClient, EchoServerTrait, Listener, Transport};
