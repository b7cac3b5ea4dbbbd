//! Graceful shutdown coordination.
//!
//! [`ShutdownSignal`] broadcasts a shutdown notification to every
//! clone; [`ConnectionTracker`] counts in-flight connections so the
//! serve loop can wait for them to drain before exiting.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Notify};

/// A signal that can be used to trigger and await graceful shutdown.
///
/// Clones share the same underlying state; triggering any clone wakes
/// all waiters.
///
/// # Example
///
/// ```rust
/// use viaduct_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let clone = shutdown.clone();
///
/// shutdown.trigger();
/// assert!(clone.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    /// Whether shutdown has been triggered
    triggered: Arc<AtomicBool>,

    /// Broadcast sender for notifying waiters
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates a new shutdown signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Creates a signal wired to Ctrl-C.
    ///
    /// Spawns a task that triggers the signal when the process receives
    /// an interrupt. Must be called within a tokio runtime.
    #[must_use]
    pub fn with_ctrl_c() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                trigger.trigger();
            }
        });
        signal
    }

    /// Triggers shutdown, waking all waiters.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        // no receivers is fine; late subscribers check the flag
        let _ = self.sender.send(());
    }

    /// Returns true once shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Waits until shutdown is triggered.
    ///
    /// Returns immediately if it already was.
    pub async fn recv(&self) {
        let mut receiver = self.sender.subscribe();
        // check after subscribing so a trigger between the two is not missed
        if self.is_shutdown() {
            return;
        }
        let _ = receiver.recv().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts in-flight connections so shutdown can wait for them.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a tracker with no active connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a token for a new connection.
    ///
    /// Dropping the token releases the connection.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            tracker: self.clone(),
        }
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until no connections are active.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.drained.notified();
            if self.active_connections() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// A token representing one tracked connection.
#[derive(Debug)]
pub struct ConnectionToken {
    tracker: ConnectionTracker,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        self.tracker.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_wakes_waiters() {
        let shutdown = ShutdownSignal::new();
        let waiter = shutdown.clone();

        let handle = tokio::spawn(async move { waiter.recv().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn recv_after_trigger_returns_immediately() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        assert!(shutdown.is_shutdown());

        tokio::time::timeout(Duration::from_millis(100), shutdown.recv())
            .await
            .expect("recv should not block after trigger");
    }

    #[tokio::test]
    async fn tracker_counts_tokens() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_connections(), 0);

        let a = tracker.acquire();
        let b = tracker.acquire();
        assert_eq!(tracker.active_connections(), 2);

        drop(a);
        assert_eq!(tracker.active_connections(), 1);
        drop(b);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[tokio::test]
    async fn wait_idle_resolves_when_last_token_drops() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let waiter = tracker.clone();
        let handle = tokio::spawn(async move { waiter.wait_idle().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(token);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait_idle should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_idle_on_fresh_tracker_returns_immediately() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(100), tracker.wait_idle())
            .await
            .expect("should not block");
    }
}
