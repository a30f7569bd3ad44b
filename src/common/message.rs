use super::config::TruncationPolicy;
use crate::endpoint::SocketPath;
use crate::{EchoError, Result};
use bytes::{Bytes, BytesMut};
use tracing::warn;

/// One discrete unit of received data
///
/// For datagram sockets the message also carries the sender's address when
/// the sender is bound to a path; connection-oriented transports leave it
/// empty because the peer is implied by the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    payload: Bytes,
    sender: Option<SocketPath>,
}

impl Message {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            sender: None,
        }
    }

    pub fn from_sender(payload: impl Into<Bytes>, sender: Option<SocketPath>) -> Self {
        Self {
            payload: payload.into(),
            sender,
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn sender(&self) -> Option<&SocketPath> {
        self.sender.as_ref()
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Outcome of a receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A unit of data; may be empty on datagram sockets
    Message(Message),
    /// Orderly shutdown by the peer; terminal for the connection
    Shutdown,
}

impl Received {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Received::Shutdown)
    }

    pub fn into_message(self) -> Option<Message> {
        match self {
            Received::Message(message) => Some(message),
            Received::Shutdown => None,
        }
    }
}

/// Allocates a receive buffer one byte larger than `limit`
///
/// A read that fills the extra byte proves the message did not fit.
pub(crate) fn receive_buffer(limit: usize) -> BytesMut {
    BytesMut::zeroed(limit + 1)
}

/// Cuts a filled receive buffer down to the received payload, applying `policy`
/// to messages that overflowed `limit`
pub(crate) fn take_payload(
    mut buffer: BytesMut,
    received: usize,
    limit: usize,
    policy: TruncationPolicy,
) -> Result<Bytes> {
    let mut len = received;
    if len > limit {
        match policy {
            TruncationPolicy::Reject => return Err(EchoError::MessageTruncated { limit }),
            TruncationPolicy::Truncate => {
                warn!(limit, "Message exceeded receive buffer and was truncated");
                len = limit;
            }
        }
    }
    buffer.truncate(len);
    Ok(buffer.freeze())
}
