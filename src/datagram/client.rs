use super::{DatagramConfig, DatagramSocket};
use crate::common::{ClientConfig, EchoClient};
use crate::endpoint::SocketPath;
use crate::{EchoError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::timeout;

static CLIENT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Echo client for the datagram server
///
/// The client binds its own return path so the server can address replies;
/// the path is removed again when the client is dropped.
///
/// # Examples
///
/// ```no_run
/// use udsecho::DatagramEchoClient;
/// use udsecho::common::EchoClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = DatagramEchoClient::connect("/tmp/udsecho-dgram.sock").await?;
///
///     let response = client.echo_string("Hello, World!").await?;
///     println!("Echo response: {}", response);
///     Ok(())
/// }
/// ```
pub struct DatagramEchoClient {
    socket: DatagramSocket,
    config: DatagramConfig,
}

impl DatagramEchoClient {
    /// Connects to a datagram echo server at the given path
    pub async fn connect(server_path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(server_path, ClientConfig::default()).await
    }

    pub async fn connect_with_config(
        server_path: impl AsRef<Path>,
        config: ClientConfig,
    ) -> Result<Self> {
        let server = SocketPath::new(server_path.as_ref())?;
        let local_path = match &config.local_path {
            Some(path) => path.clone(),
            None => generated_return_path(),
        };
        let config = DatagramConfig::for_client(local_path, &config);

        let mut socket = DatagramSocket::from_config(&config)?;
        socket.connect(&server)?;

        Ok(Self { socket, config })
    }

    /// Path replies are delivered to
    pub fn local_path(&self) -> Option<&Path> {
        self.socket.local_path()
    }
}

impl EchoClient for DatagramEchoClient {
    /// Sends one datagram and waits for the echoed datagram
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.socket.send(data).await?;

        let reply = match self.config.read_timeout {
            Some(limit) => timeout(limit, self.socket.recv())
                .await
                .map_err(|_| EchoError::Timeout("Datagram receive timeout".to_string()))??,
            None => self.socket.recv().await?,
        };

        Ok(reply.into_payload().to_vec())
    }
}

fn generated_return_path() -> PathBuf {
    let sequence = CLIENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "udsecho-client-{}-{sequence}.sock",
        std::process::id()
    ))
}
