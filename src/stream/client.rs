use super::StreamConnection;
use crate::common::{ClientConfig, EchoClient, Received};
use crate::endpoint::SocketPath;
use crate::{EchoError, Result};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

/// Echo client for the stream server
///
/// Because a stream carries no boundaries, `echo` keeps reading until as many
/// bytes came back as were sent.
///
/// # Examples
///
/// ```no_run
/// use udsecho::StreamEchoClient;
/// use udsecho::common::EchoClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = StreamEchoClient::connect("/tmp/udsecho-stream.sock").await?;
///     let response = client.echo_string("Hello, World!").await?;
///     println!("Echo response: {}", response);
///     Ok(())
/// }
/// ```
pub struct StreamEchoClient {
    connection: StreamConnection,
    read_timeout: Option<Duration>,
}

impl StreamEchoClient {
    pub async fn connect(server_path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(server_path, ClientConfig::default()).await
    }

    pub async fn connect_with_config(
        server_path: impl AsRef<Path>,
        config: ClientConfig,
    ) -> Result<Self> {
        let path = SocketPath::new(server_path.as_ref())?;
        let connection = StreamConnection::connect(&path)
            .await?
            .with_buffer_size(config.buffer_size);

        Ok(Self {
            connection,
            read_timeout: config.read_timeout,
        })
    }

    /// Signals the server that no more data follows
    pub async fn shutdown(&mut self) -> Result<()> {
        self.connection.shutdown().await
    }

    async fn read_exact_len(&mut self, expected: usize) -> Result<Vec<u8>> {
        let mut response = Vec::with_capacity(expected);
        while response.len() < expected {
            match self.connection.recv().await? {
                Received::Message(message) => response.extend_from_slice(message.payload()),
                Received::Shutdown => return Err(EchoError::PeerShutdown),
            }
        }
        Ok(response)
    }
}

impl EchoClient for StreamEchoClient {
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        self.connection.send(data).await?;

        match self.read_timeout {
            Some(limit) => timeout(limit, self.read_exact_len(data.len()))
                .await
                .map_err(|_| EchoError::Timeout("Stream receive timeout".to_string()))?,
            None => self.read_exact_len(data.len()).await,
        }
    }
}
