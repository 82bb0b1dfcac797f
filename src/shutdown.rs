use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

/// Cancellation coordinator for an interactive session
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Receiver side handed to sessions
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        info!("Shutdown requested");
        self.tx.send_replace(true);
    }

    /// Trigger shutdown on Ctrl-C
    pub fn install_signal_handlers(&self) -> Result<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => coordinator.trigger(),
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            }
        });
        info!("Installed Ctrl-C handler");
        Ok(())
    }
}

/// Observes whether the owning session has been cancelled
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires, for sessions without a coordinator
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Coordinator dropped without triggering: never resolves.
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_is_observed() {
        let coordinator = ShutdownCoordinator::new();
        let mut signal = coordinator.signal();
        assert!(!signal.is_triggered());

        coordinator.trigger();
        tokio::time::timeout(Duration::from_secs(1), signal.triggered())
            .await
            .unwrap();
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_never_signal_stays_pending() {
        let mut signal = ShutdownSignal::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.triggered()).await;
        assert!(waited.is_err());
    }
}
