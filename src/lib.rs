//! Shardline - Resilient WebSocket gateway client.
//!
//! This library maintains long-lived connections to a chat platform's
//! real-time event gateway: one WebSocket per logical shard, kept alive
//! through heartbeats and recovered through session resumption and
//! exponential-backoff reconnection.
//!
//! # Architecture
//!
//! Each [`Gateway`] owns one connection end to end:
//!
//! - A dedicated run-loop task receiving frames in strict arrival order
//! - A heartbeat timer task detecting zombie connections (two missed
//!   acknowledgements) and signaling teardown
//! - A reconnection budget with deterministic exponential backoff,
//!   preferring session resumption over full re-identification
//! - An [`EventRouter`] fanning dispatch events out to typed and raw
//!   handlers, one consumer's failure never reaching the others
//!
//! [`ShardCoordinator`] supervises several engines for horizontally
//! sharded deployments, staggering startup to respect identify rate
//! limits.
//!
//! # Quick Start
//!
//! ```no_run
//! use shardline::{Gateway, GatewayConfig, Intents, Result};
//!
//! #[derive(serde::Deserialize)]
//! struct Message {
//!     content: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = GatewayConfig::builder()
//!         .token("bot-token")
//!         .intents(Intents::GUILDS | Intents::GUILD_MESSAGES)
//!         .build()?;
//!
//!     let gateway = Gateway::connect(config).await?;
//!     gateway.on("MESSAGE_CREATE", |message: Message| {
//!         println!("received: {}", message.content);
//!     });
//!
//!     // ... run until shutdown ...
//!     gateway.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Connection configuration and builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`events`] | Event name registry and dispatch |
//! | [`gateway`] | Connection engine and state machine |
//! | `heartbeat` | Liveness supervision (internal) |
//! | [`intents`] | Event subscription bitmask |
//! | [`presence`] | Outbound presence payloads |
//! | [`protocol`] | Wire frame parsing and construction |
//! | [`reconnect`] | Bounded exponential backoff |
//! | [`shard`] | Multi-connection supervision |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Connection configuration and builder.
///
/// Use [`GatewayConfig::builder()`] to create a validated configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Event routing.
///
/// Maps dispatch event names to ordered lists of typed or raw handlers.
pub mod events;

/// Gateway connection engine.
///
/// The opcode state machine, session resumption, and failure recovery.
pub mod gateway;

/// Heartbeat supervision and zombie detection.
///
/// Internal module; the engine manages heartbeats automatically.
mod heartbeat;

/// Gateway intent bitmask.
pub mod intents;

/// Outbound presence types.
pub mod presence;

/// Gateway wire protocol.
///
/// Frame parsing and outbound payload construction.
pub mod protocol;

/// Reconnection budget and exponential backoff.
pub mod reconnect;

/// Shard coordination for horizontally partitioned deployments.
pub mod shard;

/// WebSocket transport layer.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{GatewayConfig, GatewayConfigBuilder};

// Error types
pub use error::{Error, Result};

// Events
pub use events::EventRouter;

// Engine types
pub use gateway::{ConnectionState, Gateway};

// Intents
pub use intents::Intents;

// Presence
pub use presence::{Activity, PresenceUpdate, StatusKind};

// Reconnection
pub use reconnect::ReconnectPolicy;

// Sharding
pub use shard::{ShardCoordinator, shard_for_key};

// Transport
pub use transport::{Transport, WebSocketTransport};
