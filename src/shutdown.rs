//! Cooperative shutdown signalling.
//!
//! One signal, many tokens: every worker clones a `ShutdownToken` and either
//! polls `is_cancelled` between steps or awaits `cancelled` inside a
//! `select!`. Dropping the signal counts as a trigger, so a worker can never
//! outlive `main`.

use tokio::sync::watch;

pub fn channel() -> (ShutdownSignal, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSignal { tx }, ShutdownToken { rx })
}

pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn trigger(&self) {
        // Receivers may all be gone already; that's fine.
        let _ = self.tx.send(true);
    }
}

#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is triggered (or the signal is dropped).
    /// Cancellation-safe, so it can sit in a `select!` arm.
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_all_tokens() {
        let (signal, token) = channel();
        let mut second = token.clone();
        assert!(!token.is_cancelled());

        signal.trigger();
        assert!(token.is_cancelled());
        tokio::time::timeout(Duration::from_millis(50), second.cancelled())
            .await
            .expect("cancelled() should resolve after trigger");
    }

    #[tokio::test]
    async fn test_dropped_signal_counts_as_trigger() {
        let (signal, mut token) = channel();
        drop(signal);
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("cancelled() should resolve after the signal is dropped");
    }
}
