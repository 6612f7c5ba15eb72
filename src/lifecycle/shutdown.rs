//! Shutdown coordination for the gateway.

use std::sync::Arc;

use tokio::sync::watch;

/// Where the process is in its shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownPhase {
    Running,
    /// Stop accepting, let in-flight requests finish.
    Draining,
    /// Stop waiting for in-flight requests.
    Forced,
}

/// Coordinator for graceful shutdown.
///
/// Cheap to clone; every clone observes the same phase. Phases only move forward.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<ShutdownPhase>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ShutdownPhase::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.tx.borrow()
    }

    /// Begin draining.
    pub fn trigger(&self) {
        self.advance_to(ShutdownPhase::Draining);
    }

    /// Abandon draining.
    pub fn force(&self) {
        self.advance_to(ShutdownPhase::Forced);
    }

    /// Resolves once draining has begun.
    pub async fn draining(&self) {
        self.wait_for(ShutdownPhase::Draining).await;
    }

    /// Resolves once shutdown has been forced.
    pub async fn forced(&self) {
        self.wait_for(ShutdownPhase::Forced).await;
    }

    fn advance_to(&self, phase: ShutdownPhase) {
        self.tx.send_if_modified(|current| {
            if phase > *current {
                *current = phase;
                true
            } else {
                false
            }
        });
    }

    async fn wait_for(&self, phase: ShutdownPhase) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|current| *current >= phase).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
