//! Event routing.
//!
//! Dispatch frames carry a named event and a payload; this module fans
//! each one out to the consumers registered for its name.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `router` | Handler registry and synchronous dispatch |

// ============================================================================
// Submodules
// ============================================================================

/// Handler registry and dispatch.
pub mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use router::EventRouter;
