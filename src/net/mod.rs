//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (lifecycle tracking)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Plain TCP only; TLS termination happens in front of the gateway

pub mod connection;
pub mod listener;

pub use connection::ConnectionTracker;
pub use listener::{Listener, ListenerError};
