use super::SeqpacketConnection;
use crate::common::{ClientConfig, EchoClient, Received};
use crate::endpoint::SocketPath;
use crate::{EchoError, Result};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

/// Echo client for the seqpacket server
///
/// Each request is one message and each reply is one message, so no framing
/// is needed.
///
/// # Examples
///
/// ```no_run
/// use udsecho::SeqpacketEchoClient;
/// use udsecho::common::EchoClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = SeqpacketEchoClient::connect("/tmp/udsecho-seqpacket.sock").await?;
///     let response = client.echo_string("ping").await?;
///     assert_eq!(response, "ping");
///     Ok(())
/// }
/// ```
pub struct SeqpacketEchoClient {
    connection: SeqpacketConnection,
    read_timeout: Option<Duration>,
}

impl SeqpacketEchoClient {
    pub async fn connect(server_path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(server_path, ClientConfig::default()).await
    }

    pub async fn connect_with_config(
        server_path: impl AsRef<Path>,
        config: ClientConfig,
    ) -> Result<Self> {
        let path = SocketPath::new(server_path.as_ref())?;
        let connection = SeqpacketConnection::connect(&path)
            .await?
            .with_buffer_size(config.buffer_size)
            .with_truncation(config.truncation);

        Ok(Self {
            connection,
            read_timeout: config.read_timeout,
        })
    }

    /// Signals the server that no more requests follow
    pub fn shutdown(&self) -> Result<()> {
        self.connection.shutdown()
    }
}

impl EchoClient for SeqpacketEchoClient {
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.connection.send(data).await?;

        let received = match self.read_timeout {
            Some(limit) => timeout(limit, self.connection.recv())
                .await
                .map_err(|_| EchoError::Timeout("Seqpacket receive timeout".to_string()))??,
            None => self.connection.recv().await?,
        };

        match received {
            Received::Message(message) => Ok(message.into_payload().to_vec()),
            Received::Shutdown => Err(EchoError::PeerShutdown),
        }
    }
}
