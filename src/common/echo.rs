use super::message::Received;
use super::traits::Transport;
use crate::{EchoError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// Totals for one echo session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoSummary {
    /// Messages echoed back
    pub messages: u64,
    /// Payload bytes echoed back
    pub bytes: u64,
}

/// The echo loop: receive, reply with the identical payload, repeat
///
/// The service is transport-agnostic. It returns `Ok` when the peer shuts the
/// connection down in an orderly way and the first error otherwise; on
/// datagram sockets, which have no shutdown, it only returns on error.
///
/// # Examples
///
/// ```no_run
/// use udsecho::{EchoService, SeqpacketConnection, SocketPath};
///
/// # async fn example() -> udsecho::Result<()> {
/// let path = SocketPath::new("/tmp/udsecho-seqpacket.sock")?;
/// let mut connection = SeqpacketConnection::connect(&path).await?;
/// let summary = EchoService::new().serve(&mut connection).await?;
/// println!("echoed {} messages", summary.messages);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EchoService {
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl EchoService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_timeout(mut self, limit: Option<Duration>) -> Self {
        self.read_timeout = limit;
        self
    }

    pub fn with_write_timeout(mut self, limit: Option<Duration>) -> Self {
        self.write_timeout = limit;
        self
    }

    /// Echoes every message received on `transport` until shutdown or error
    pub async fn serve<T>(&self, transport: &mut T) -> Result<EchoSummary>
    where
        T: Transport + ?Sized,
    {
        let mut summary = EchoSummary::default();

        loop {
            let message = match bounded(self.read_timeout, "receive", transport.recv()).await? {
                Received::Message(message) => message,
                Received::Shutdown => {
                    info!(
                        messages = summary.messages,
                        bytes = summary.bytes,
                        "Peer closed connection"
                    );
                    return Ok(summary);
                }
            };

            let size = message.len();
            let preview = String::from_utf8_lossy(&message.payload()[..size.min(64)]);
            info!(size, preview = %preview, sender = ?message.sender(), "Received data");

            bounded(self.write_timeout, "reply", transport.reply(&message)).await?;

            summary.messages += 1;
            summary.bytes += size as u64;
            debug!(size, "Echoed data");
        }
    }
}

async fn bounded<F, T>(limit: Option<Duration>, what: &str, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => timeout(limit, operation)
            .await
            .map_err(|_| EchoError::Timeout(format!("{what} timed out after {limit:?}")))?,
        None => operation.await,
    }
}
