//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → transport
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop, add security headers if absent)
//!     → client
//! ```
//!
//! # Design Decisions
//! - Security headers never overwrite backend choices
//! - No trust in client-supplied hop-by-hop headers

pub mod headers;

pub use headers::{harden_response, SECURITY_HEADERS};
