use super::config::ConnectionConfig;
use super::connection_server::ConnectionEchoServer;
use super::traits::{EchoServerTrait, Listener};
use crate::Result;
use crate::datagram::{DatagramConfig, DatagramEchoServer, DatagramSocket};
use crate::endpoint::SocketPath;
use std::path::Path;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a server spawned for a test
pub struct TestServer {
    pub handle: JoinHandle<Result<()>>,
    pub shutdown: broadcast::Sender<()>,
}

impl TestServer {
    /// Signals shutdown and waits for the server task to finish
    pub async fn stop(self) -> Result<()> {
        // no receiver left means the server task has already returned
        if self.shutdown.send(()).is_err() {
            debug!("Server already stopped before shutdown was signalled");
        }
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(crate::EchoError::Config(format!("server task failed: {e}"))),
        }
    }
}

/// Joins `name` onto `dir` and validates it as a socket address
pub fn socket_path_in(dir: &Path, name: &str) -> Result<SocketPath> {
    SocketPath::new(dir.join(name))
}

/// Spawns a connection-oriented echo server that is already listening
///
/// The listener is bound before the task starts, so clients may connect as
/// soon as this returns.
pub async fn spawn_connection_server<L: Listener>(config: ConnectionConfig) -> Result<TestServer> {
    let listener = L::bind(&config).await?;
    let server = ConnectionEchoServer::<L>::new(config);
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.serve(listener).await });
    Ok(TestServer { handle, shutdown })
}

/// Spawns a datagram echo server whose socket is already bound
pub async fn spawn_datagram_server(config: DatagramConfig) -> Result<TestServer> {
    let socket = DatagramSocket::from_config(&config)?;
    let server = DatagramEchoServer::new(config);
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.serve(socket).await });
    Ok(TestServer { handle, shutdown })
}
