//! Protocol upgrade relay.
//!
//! # Responsibilities
//! - Wait for both legs of a `101 Switching Protocols` exchange to upgrade
//! - Copy bytes in both directions until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←──── raw upgraded stream ────→ Gateway ←──── raw upgraded stream ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Frame-agnostic: bytes are relayed, websocket frames are not parsed
//! - Relay runs in its own task; request handling has already completed

use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

/// Spawn a task relaying bytes between the upgraded client and backend connections.
pub fn spawn_relay(client: OnUpgrade, upstream: OnUpgrade) {
    tokio::spawn(async move {
        let (client, upstream) = match tokio::try_join!(client, upstream) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "Protocol upgrade failed");
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut upstream = TokioIo::new(upstream);
        match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
            Ok((from_client, from_upstream)) => {
                tracing::debug!(from_client, from_upstream, "Upgraded connection closed");
            }
            Err(e) => {
                tracing::debug!(error = %e, "Upgraded connection ended with error");
            }
        }
    });
}
