//! Shared source of terminal resize notifications.
//!
//! Every streaming invocation holds one [`ResizeSubscription`] for as long
//! as its process is alive. Dropping the subscription is the unsubscription,
//! so a finished invocation can never be resized again.

use tokio::sync::broadcast::{self, error::RecvError};

const RESIZE_BUFFER: usize = 16;

/// Fan-out of "the display was resized" events.
#[derive(Debug, Clone)]
pub struct ResizeSource {
    tx: broadcast::Sender<()>,
}

impl ResizeSource {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(RESIZE_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> ResizeSubscription {
        ResizeSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Notifies every live subscriber; returns how many were reached.
    pub fn notify(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ResizeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ResizeSubscription {
    rx: broadcast::Receiver<()>,
}

impl ResizeSubscription {
    /// Waits for the next resize. Bursts that overflowed the buffer collapse
    /// into a single notification. `None` once the source is gone.
    pub async fn changed(&mut self) -> Option<()> {
        match self.rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => Some(()),
            Err(RecvError::Closed) => None,
        }
    }
}
