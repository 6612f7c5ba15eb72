//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGTERM and SIGINT
//! - First signal starts draining, a second one forces shutdown
//!
//! # Design Decisions
//! - Handlers are registered once, so a second signal is never lost between waits

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Stream of termination signals.
pub struct TerminationSignals {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    /// Install the handlers.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
                sigint: signal(SignalKind::interrupt())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next signal and return its name.
    pub async fn next(&mut self) -> std::io::Result<&'static str> {
        #[cfg(unix)]
        {
            let name = tokio::select! {
                _ = self.sigterm.recv() => "SIGTERM",
                _ = self.sigint.recv() => "SIGINT",
            };
            Ok(name)
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok("ctrl-c")
        }
    }
}

/// Spawn a task translating termination signals into shutdown phases.
pub fn spawn_signal_handler(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    let mut signals = TerminationSignals::install()?;

    Ok(tokio::spawn(async move {
        match signals.next().await {
            Ok(name) => {
                tracing::info!(signal = name, "Received termination signal, initiating graceful shutdown");
                shutdown.trigger();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to wait for termination signal");
                return;
            }
        }

        match signals.next().await {
            Ok(name) => {
                tracing::warn!(signal = name, "Received second termination signal, forcing shutdown");
                shutdown.force();
            }
            Err(e) => tracing::error!(error = %e, "Failed to wait for termination signal"),
        }
    }))
}
