//! Connected-client count, pushed to subscribers.
//!
//! Every accepted connection bumps the count and every closed one drops
//! it; each change is sent to all current subscribers. Subscribers whose
//! receiver is gone are pruned on the next change.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    clients: usize,
    subscribers: Vec<mpsc::UnboundedSender<usize>>,
}

/// Shared client-count registry. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    inner: Arc<Mutex<Inner>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a receiver that gets the current count right away and every
    /// change after that.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<usize> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().await;
        let _ = tx.send(inner.clients);
        inner.subscribers.push(tx);
        rx
    }

    /// Sends `value` to every subscriber.
    pub async fn notify(&self, value: usize) {
        let mut inner = self.inner.lock().await;
        Self::broadcast(&mut inner, value);
    }

    pub async fn client_connected(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.clients += 1;
        let clients = inner.clients;
        Self::broadcast(&mut inner, clients);
        clients
    }

    pub async fn client_disconnected(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.clients = inner.clients.saturating_sub(1);
        let clients = inner.clients;
        Self::broadcast(&mut inner, clients);
        clients
    }

    pub async fn client_count(&self) -> usize {
        self.inner.lock().await.clients
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.lock().await.subscribers.len()
    }

    /// Sends to a snapshot of the subscriber list, then drops the closed ones.
    fn broadcast(inner: &mut Inner, value: usize) {
        let snapshot = inner.subscribers.clone();
        let mut closed = 0;
        for subscriber in &snapshot {
            if subscriber.send(value).is_err() {
                closed += 1;
            }
        }
        if closed > 0 {
            inner.subscribers.retain(|s| !s.is_closed());
            tracing::debug!(closed, "pruned telemetry subscribers");
        }
    }
}
