//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host header)
//!     → identifier.rs (leftmost label, shape validation)
//!     → directory.rs (GET {base}/servers/{identifier})
//!     → Return: RouteDecision { target_url, require_auth } or DirectoryError
//! ```
//!
//! # Design Decisions
//! - Identifier extraction is pure and runs before any network call
//! - One directory round trip per request, never cached
//! - The directory is injected as a trait object so the gateway can be tested
//!   without a network

pub mod directory;
pub mod identifier;

pub use directory::{Directory, DirectoryError, HttpDirectory, RouteDecision};
pub use identifier::{extract_identifier, identifier_from_request, RoutingIdentifier};
