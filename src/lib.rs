//! # Convergence
//!
//! A WebSocket hub that fans a user query out to every connected agent,
//! collects one answer per agent and synthesizes the collected answers
//! exactly once per round.
//!
//! ## Overview
//!
//! Convergence can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `convergence-server` binary
//! 2. **As a library** - Embed the [`Coordinator`] or the whole router
//!
//! ### Embedding the server
//!
//! ```rust,ignore
//! use convergence::{api::routes::create_app, AppState, ConvergenceConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let state = AppState::new(ConvergenceConfig::default());
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//!     axum::serve(listener, create_app(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Driving rounds directly
//!
//! ```rust,ignore
//! use convergence::{Coordinator, DeliberationStore, PeerRegistry, Query};
//! use convergence::peers::ConnectionHandle;
//! use std::sync::Arc;
//!
//! let coordinator = Coordinator::new(
//!     Arc::new(PeerRegistry::new()),
//!     Arc::new(DeliberationStore::new()),
//! );
//! let (connection, _inbox) = ConnectionHandle::channel();
//! let peer = coordinator.register_peer("claude", None, connection);
//!
//! let started = coordinator.start_round(Query::new("hello", "user-1"))?;
//! coordinator.submit_response(&started.round_id, peer.id, "claude", "hi")?;
//! ```
//!
//! ## Modules
//!
//! - [`peers`] - Connected agents and their outbound channels
//! - [`deliberation`] - Rounds, the store, synthesis and the coordinator
//! - [`broadcast`] - Fan-out of server events to peers
//! - [`protocol`] - WebSocket wire events
//! - [`api`] - REST and WebSocket handlers and routes
//! - [`sweep`] - Background eviction of finished rounds and dead peers
//! - [`types`] - Common types and error handling

#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP and WebSocket handlers and routes.
pub mod api;
/// Fan-out of events to connected peers.
pub mod broadcast;
/// Command-line interface.
pub mod cli;
/// Deliberation rounds and their coordination.
pub mod deliberation;
/// Connected peers and the registry.
pub mod peers;
/// Wire protocol spoken over the WebSocket.
pub mod protocol;
/// Periodic eviction of stale state.
pub mod sweep;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use deliberation::{
    Coordinator, DeliberationStore, Query, Round, RoundId, StructuralSynthesizer, Synthesis,
    Synthesizer,
};
pub use peers::{Peer, PeerId, PeerRegistry};
pub use protocol::{ClientEvent, ServerEvent};
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigError, ConvergenceConfig};

use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration the server was started with
    pub config: Arc<ConvergenceConfig>,
    /// Round coordinator, owning the peer registry and round store
    pub coordinator: Arc<Coordinator>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ConvergenceConfig) -> Self {
        let coordinator = Coordinator::new(
            Arc::new(PeerRegistry::new()),
            Arc::new(DeliberationStore::new()),
        );
        Self::with_coordinator(config, Arc::new(coordinator))
    }

    pub fn with_coordinator(config: ConvergenceConfig, coordinator: Arc<Coordinator>) -> Self {
        Self {
            config: Arc::new(config),
            coordinator,
            started_at: Instant::now(),
        }
    }
}
