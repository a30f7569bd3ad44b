use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Shutdown channel owned by a server
///
/// The first receiver is created together with the sender, so a signal sent
/// before the server starts serving is still delivered.
pub(crate) struct ShutdownChannel {
    sender: Arc<broadcast::Sender<()>>,
    pending: Mutex<Option<broadcast::Receiver<()>>>,
}

impl ShutdownChannel {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = broadcast::channel(1);
        Self {
            sender: Arc::new(sender),
            pending: Mutex::new(Some(receiver)),
        }
    }

    pub(crate) fn sender(&self) -> broadcast::Sender<()> {
        self.sender.as_ref().clone()
    }

    /// Hands out the receiver created at construction, then fresh subscriptions
    pub(crate) fn receiver(&self) -> broadcast::Receiver<()> {
        let pending = match self.pending.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        pending.unwrap_or_else(|| self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_sent_before_receiving_is_kept() {
        let channel = ShutdownChannel::new();
        channel.sender().send(()).unwrap();

        let mut receiver = channel.receiver();
        assert!(receiver.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_later_receivers_subscribe() {
        let channel = ShutdownChannel::new();
        let _first = channel.receiver();
        let mut second = channel.receiver();

        channel.sender().send(()).unwrap();
        assert!(second.recv().await.is_ok());
    }
}
