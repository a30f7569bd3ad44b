use super::{DatagramConfig, DatagramSocket};
use crate::common::shutdown::ShutdownChannel;
use crate::common::{EchoServerTrait, EchoService};
use crate::{EchoError, Result};
use tracing::{error, info, warn};

/// Echo server over a bound datagram socket
///
/// Every datagram is answered with an identical datagram sent to its sender.
/// A read timeout only logs a warning; any other failure ends the session and
/// is returned from `run`/`serve`.
///
/// # Examples
///
/// ```no_run
/// use udsecho::{DatagramConfig, DatagramEchoServer};
/// use udsecho::common::EchoServerTrait;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatagramConfig::new("/tmp/udsecho-dgram.sock").with_buffer_size(1024);
///
///     let server = DatagramEchoServer::new(config);
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct DatagramEchoServer {
    config: DatagramConfig,
    shutdown: ShutdownChannel,
}

impl DatagramEchoServer {
    pub fn new(config: DatagramConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownChannel::new(),
        }
    }

    pub fn config(&self) -> &DatagramConfig {
        &self.config
    }

    /// Echoes datagrams arriving on `socket` until shutdown or a failure
    pub async fn serve(&self, mut socket: DatagramSocket) -> Result<()> {
        let echo = EchoService::new()
            .with_read_timeout(self.config.read_timeout)
            .with_write_timeout(self.config.write_timeout);
        let mut shutdown_rx = self.shutdown.receiver();

        info!(
            path = ?socket.local_path(),
            buffer_size = socket.buffer_size(),
            "Datagram echo server listening"
        );

        let outcome = loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal, stopping server");
                    break Ok(());
                }
                result = echo.serve(&mut socket) => match result {
                    Err(EchoError::Timeout(reason)) => {
                        warn!(%reason, "Receive timeout");
                    }
                    Err(e) => {
                        error!(error = %e, "Datagram session failed");
                        break Err(e);
                    }
                    Ok(summary) => {
                        info!(messages = summary.messages, bytes = summary.bytes, "Datagram session finished");
                        break Ok(());
                    }
                },
            }
        };

        socket.close();
        info!("Datagram echo server stopped");
        outcome
    }
}

impl EchoServerTrait for DatagramEchoServer {
    /// Binds the configured path and echoes datagrams on it
    async fn run(&self) -> Result<()> {
        let socket = DatagramSocket::from_config(&self.config)?;
        self.serve(socket).await
    }

    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown.sender()
    }
}
