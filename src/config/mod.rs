//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (TOML file, then PORT / DIRECTORY_URL / REQUEST_TIMEOUT_SECS)
//!     → CLI flags (main.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::DirectoryConfig;
pub use schema::GatewayConfig;
pub use schema::InspectionConfig;
pub use schema::ListenerConfig;
pub use schema::TimeoutConfig;
