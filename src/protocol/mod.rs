//! Gateway wire protocol.
//!
//! Frame parsing and construction for the JSON gateway encoding. Every
//! frame is an object with an integer `op`, optional sequence `s`,
//! optional event name `t`, and opcode-dependent payload `d`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `opcode` | Closed integer opcode table |
//! | `frame` | Inbound frame parsing, payload kept raw |
//! | `outbound` | Wire-ready builders for client frames |

// ============================================================================
// Submodules
// ============================================================================

/// Closed integer opcode table.
pub mod opcode;

/// Inbound frame parsing.
pub mod frame;

/// Outbound frame construction.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{GatewayFrame, HelloData, ReadyData};
pub use opcode::Opcode;
