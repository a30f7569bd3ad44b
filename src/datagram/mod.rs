//! Connectionless, boundary-preserving Unix datagram transport
//!
//! Each `send_to` is delivered as one unit or not at all; zero-length
//! datagrams are ordinary messages. A datagram socket has no shutdown
//! indication, so the echo session over it only ends on error or when the
//! server is told to stop.

pub mod client;
pub mod config;
pub mod server;
pub mod socket;


pub use client::DatagramEchoClient;
pub use config::DatagramConfig;
pub use server::DatagramEchoServer;
pub use socket::DatagramSocket;
