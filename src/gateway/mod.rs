//! Gateway connection engine.
//!
//! One [`Gateway`] owns one long-lived connection: its transport, its
//! heartbeat supervisor, its session descriptor, and its reconnection
//! budget. Sharded deployments run several engines side by side under a
//! [`ShardCoordinator`](crate::ShardCoordinator).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `state` | Connection state machine and session bookkeeping |
//! | `engine` | The run loop, opcode table, and public handle |

// ============================================================================
// Submodules
// ============================================================================

/// Connection state and session bookkeeping.
pub mod state;

/// The connection engine and public handle.
pub mod engine;

// ============================================================================
// Re-exports
// ============================================================================

pub use engine::{Gateway, ReconnectHook, StateHook};
pub use state::ConnectionState;
