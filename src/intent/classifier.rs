//! Intent classification over a bounded body prefix.
//!
//! # Responsibilities
//! - Find the first `"method": "<name>"` pair in a byte prefix
//! - Map the method name to a coarse [`Intent`]
//! - Drain a peek branch until the byte bound or end-of-stream
//!
//! # Design Decisions
//! - Byte regex, so invalid UTF-8 and binary input simply do not match
//! - First match wins, even when later frames carry a different method
//! - Never fails: anything unrecognisable is `Intent::Unknown`

use std::fmt;
use std::sync::LazyLock;

use futures_util::StreamExt;
use regex::bytes::Regex;

use crate::intent::tee::PeekBranch;

/// Method names that set up a session.
pub const SESSION_SETUP_METHODS: &[&str] = &["initialize", "notifications/initialized"];

/// Method names that enumerate server capabilities.
pub const CAPABILITY_LISTING_METHODS: &[&str] = &[
    "tools/list",
    "prompts/list",
    "resources/list",
    "resources/templates/list",
];

static METHOD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""method"\s*:\s*"([^"]+)""#).expect("method pattern is valid")
});

/// Coarse classification of a request's declared protocol method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Session setup.
    Initialize,
    /// Capability enumeration.
    ListCapabilities,
    /// Any other named method.
    Invoke(String),
    /// No method found in the scanned prefix.
    Unknown,
}

impl Intent {
    /// Map a method name through the fixed table.
    pub fn from_method(method: &str) -> Self {
        if SESSION_SETUP_METHODS.contains(&method) {
            Intent::Initialize
        } else if CAPABILITY_LISTING_METHODS.contains(&method) {
            Intent::ListCapabilities
        } else {
            Intent::Invoke(method.to_string())
        }
    }

    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Initialize => "initialize",
            Intent::ListCapabilities => "list_capabilities",
            Intent::Invoke(_) => "invoke",
            Intent::Unknown => "unknown",
        }
    }

    pub fn is_invoke(&self) -> bool {
        matches!(self, Intent::Invoke(_))
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Invoke(method) => write!(f, "invoke({})", method),
            other => f.write_str(other.label()),
        }
    }
}

/// Extract the first declared method name from a byte prefix.
pub fn extract_method(prefix: &[u8]) -> Option<String> {
    METHOD_PATTERN
        .captures(prefix)
        .and_then(|caps| caps.get(1))
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
        .map(str::to_string)
}

/// Classify an already buffered prefix. Only the first `limit` bytes count.
pub fn classify_prefix(prefix: &[u8], limit: usize) -> Intent {
    let scanned = &prefix[..prefix.len().min(limit)];
    match extract_method(scanned) {
        Some(method) => Intent::from_method(&method),
        None => Intent::Unknown,
    }
}

/// Drain a peek branch until `limit` bytes or end-of-stream, then classify.
pub async fn classify(mut peek: PeekBranch, limit: usize) -> Intent {
    let mut buf = Vec::with_capacity(limit);
    while buf.len() < limit {
        match peek.next().await {
            Some(chunk) => {
                let take = chunk.len().min(limit - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            None => break,
        }
    }
    let intent = classify_prefix(&buf, limit);
    tracing::debug!(scanned = buf.len(), intent = %intent, "Intent classified");
    intent
}
