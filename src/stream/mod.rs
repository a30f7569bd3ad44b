//! Connection-oriented Unix byte-stream transport

pub mod client;
pub mod connection;
pub mod listener;

#[cfg(test)]
mod tests;

pub use client::StreamEchoClient;
pub use connection::StreamConnection;
pub use listener::StreamListener;

/// Echo server for stream connections
pub type StreamEchoServer = crate::common::ConnectionEchoServer<StreamListener>;
