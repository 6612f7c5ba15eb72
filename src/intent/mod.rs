//! Request intent inspection.
//!
//! # Data Flow
//! ```text
//! request body
//!     → tee.rs (fork: peek branch + forward branch)
//!     → classifier.rs (first "method" in the peek prefix → Intent)
//!     → gateway applies the auth decision
//!     → forward branch becomes the upstream request body
//! ```
//!
//! # Design Decisions
//! - Inspection is best-effort and bounded by the peek limit
//! - The forward branch carries the unmodified body byte-for-byte

pub mod classifier;
pub mod tee;

pub use classifier::{classify, classify_prefix, Intent};
pub use tee::{fork, ForwardBranch, PeekBranch};
