use super::config::ConnectionConfig;
use super::echo::EchoService;
use super::shutdown::ShutdownChannel;
use super::traits::{EchoServerTrait, Listener, Transport};
use crate::Result;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, watch};
use tracing::{Instrument, error, info, warn};

/// Echo server for any connection-oriented transport
///
/// Every accepted connection is served by its own task, so one peer's
/// failure or slowness never affects the others. Shutting the server down
/// closes the listener, which removes its socket file, and ends every
/// connection task.
pub struct ConnectionEchoServer<L: Listener> {
    config: ConnectionConfig,
    shutdown: ShutdownChannel,
    listener: PhantomData<fn() -> L>,
}

impl<L: Listener> ConnectionEchoServer<L> {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownChannel::new(),
            listener: PhantomData,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Serves connections from an already bound listener until shutdown
    ///
    /// Accept failures are fatal for the server; failures inside a connection
    /// only end that connection. A shutdown signalled before this is called
    /// stops the server as soon as it starts.
    pub async fn serve(&self, listener: L) -> Result<()> {
        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = self.shutdown.receiver();
        // connection tasks started after the signal still see it
        let (stopping, _) = watch::channel(false);
        let echo = EchoService::new()
            .with_read_timeout(self.config.read_timeout)
            .with_write_timeout(self.config.write_timeout);
        let mut next_id: u64 = 0;

        info!(
            path = %listener.local_path().display(),
            backlog = self.config.backlog,
            "Echo server listening"
        );

        let outcome = loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal, stopping server");
                    break Ok(());
                }
                accept_result = listener.accept() => {
                    let mut connection = match accept_result {
                        Ok(connection) => connection,
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            break Err(e);
                        }
                    };
                    next_id += 1;

                    let current_count = connection_count.load(Ordering::SeqCst);
                    if current_count >= self.config.max_connections {
                        warn!(
                            conn = next_id,
                            current = current_count,
                            limit = self.config.max_connections,
                            "Connection rejected: limit reached"
                        );
                        continue;
                    }

                    let new_count = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(conn = next_id, mode = %connection.mode(), current = new_count, "Accepted connection");

                    let echo = echo.clone();
                    let connection_count = connection_count.clone();
                    let mut stop = stopping.subscribe();
                    let span = tracing::info_span!("connection", conn = next_id);
                    tokio::spawn(
                        async move {
                            tokio::select! {
                                result = echo.serve(&mut connection) => match result {
                                    Ok(summary) => info!(messages = summary.messages, bytes = summary.bytes, "Session finished"),
                                    Err(e) => error!(error = %e, "Error handling connection"),
                                },
                                _ = stop.wait_for(|stopped| *stopped) => info!("Closing connection on shutdown"),
                            }
                            drop(connection);
                            let final_count = connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                            info!(current = final_count, "Connection closed");
                        }
                        .instrument(span),
                    );
                }
            }
        };

        stopping.send_replace(true);
        drop(listener);
        info!("Echo server stopped");
        outcome
    }
}

impl<L: Listener> EchoServerTrait for ConnectionEchoServer<L> {
    /// Binds the configured path and serves connections on it
    async fn run(&self) -> Result<()> {
        let listener = L::bind(&self.config).await?;
        self.serve(listener).await
    }

    fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.sender()
    }
}
