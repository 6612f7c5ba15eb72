//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!     second SIGTERM/SIGINT → Shutdown::force
//!
//! Shutdown (shutdown.rs):
//!     Running → Draining → Forced
//!
//! Server (http::server):
//!     Draining → stop accepting → drain connections → ShutdownOutcome
//! ```
//!
//! # Design Decisions
//! - Draining has a hard deadline: forced exit after the grace period
//! - Exit code reflects whether draining completed

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownPhase};
pub use signals::spawn_signal_handler;

/// How the server stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every connection finished within the grace period.
    Graceful,
    /// The grace period expired or a second signal arrived.
    Forced,
}

impl ShutdownOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            ShutdownOutcome::Graceful => 0,
            ShutdownOutcome::Forced => 1,
        }
    }
}
