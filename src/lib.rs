//! Tool gateway: a host-routed reverse proxy for tool servers.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────────┐
//!                        │                       TOOL GATEWAY                        │
//!                        │                                                           │
//!   Client Request       │  ┌─────────┐   ┌─────────┐   ┌───────────────────────┐    │
//!   ─────────────────────┼─▶│   net   │──▶│  http   │──▶│        gateway        │    │
//!                        │  │listener │   │ server  │   │  Stage state machine  │    │
//!                        │  └─────────┘   └─────────┘   └───────────┬───────────┘    │
//!                        │                                          │                │
//!                        │          ┌───────────────┬───────────────┼──────────┐     │
//!                        │          ▼               ▼               ▼          │     │
//!                        │   ┌────────────┐  ┌────────────┐  ┌────────────┐    │     │     Directory
//!                        │   │  routing   │  │   intent   │  │  gateway   │    │     │     Service
//!                        │   │ identifier │  │ tee +      │  │  policy    │    │     │        ▲
//!                        │   │ directory ─┼──┼────────────┼──┼────────────┼────┼─────┼────────┘
//!                        │   └────────────┘  │ classifier │  └────────────┘    │     │
//!                        │                   └────────────┘                    ▼     │
//!   Client Response      │  ┌──────────┐                            ┌──────────────┐ │
//!   ◀────────────────────┼──│ security │◀───────────────────────────│  transport   │◀┼──── Backend
//!                        │  │ headers  │                            │ hyper client │ │
//!                        │  └──────────┘                            └──────────────┘ │
//!                        │                                                           │
//!                        │  Cross-cutting: config, lifecycle, observability, error   │
//!                        └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod intent;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;
pub mod transport;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{Gateway, GatewaySettings};
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownOutcome};
