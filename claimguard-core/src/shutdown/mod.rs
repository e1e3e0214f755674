//! Graceful shutdown coordinator

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

/// Shutdown signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Finish the current unit of work and flush
    Graceful,
    /// Stop as soon as possible
    Immediate,
}

/// Shutdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
    Shutdown,
}

/// Broadcasts one shutdown signal to every background task
pub struct ShutdownCoordinator {
    state: Arc<RwLock<ShutdownState>>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);

        Self {
            state: Arc::new(RwLock::new(ShutdownState::Running)),
            shutdown_tx,
        }
    }

    /// Subscribe to shutdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }

    /// Ask every subscriber to finish up. Returns how many were notified.
    pub async fn shutdown(&self) -> usize {
        self.signal(ShutdownSignal::Graceful, ShutdownState::ShuttingDown).await
    }

    /// Ask every subscriber to stop without finishing up
    pub async fn shutdown_immediately(&self) -> usize {
        self.signal(ShutdownSignal::Immediate, ShutdownState::Shutdown).await
    }

    async fn signal(&self, signal: ShutdownSignal, next: ShutdownState) -> usize {
        let mut state = self.state.write().await;
        if *state == ShutdownState::Shutdown
            || (*state == ShutdownState::ShuttingDown && signal == ShutdownSignal::Graceful)
        {
            warn!("Shutdown already in progress");
            return 0;
        }
        *state = next;
        drop(state);

        info!(?signal, "Initiating shutdown");
        match self.shutdown_tx.send(signal) {
            Ok(receivers) => receivers,
            Err(_) => {
                // No subscribers; nothing to wait for.
                0
            }
        }
    }

    /// Record that every subscriber has finished
    pub async fn complete(&self) {
        *self.state.write().await = ShutdownState::Shutdown;
        info!("Shutdown complete");
    }

    /// Check if shutdown is in progress
    pub async fn is_shutting_down(&self) -> bool {
        let state = self.state.read().await;
        *state != ShutdownState::Running
    }

    /// Get current state
    pub async fn state(&self) -> ShutdownState {
        *self.state.read().await
    }
}

/// Trigger a graceful shutdown on Ctrl+C (and SIGTERM on unix)
pub fn install_signal_handlers(coordinator: Arc<ShutdownCoordinator>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Failed to listen for Ctrl+C: {}", e);
                        return;
                    }
                    info!("Received Ctrl+C");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            info!("Received Ctrl+C");
        }

        coordinator.shutdown().await;
    });
}
