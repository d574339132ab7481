//! Gateway transport layer.
//!
//! A transport owns exactly one full-duplex socket and knows nothing
//! about the protocol running over it: connect, send one text frame,
//! receive one complete text frame, report liveness, close.
//!
//! # Connection Lifecycle
//!
//! 1. [`Transport::connect`] - Open the socket against a gateway URL
//! 2. [`Transport::send`] / [`Transport::receive`] - Exchange text frames
//! 3. [`Transport::close`] - Tear down; idempotent
//!
//! The engine reuses one transport across reconnects by calling
//! `connect` again after `close`.
//!
//! # Blocking Reads
//!
//! `receive` blocks until one whole logical message is available. There
//! is no engine-level read timeout: a dead socket is expected to surface
//! through the transport's own close/error signaling (heartbeat zombie
//! detection covers the silent case).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | Production transport over `tokio-tungstenite` |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Production WebSocket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WebSocketTransport;

// ============================================================================
// Transport
// ============================================================================

/// A single full-duplex text-frame socket.
///
/// Implementations own the only mutable socket handle; the engine never
/// shares a transport across shards. I/O errors surface to the caller as
/// `Err`, never swallowed.
#[async_trait]
pub trait Transport: Send {
    /// Opens the socket against `url`, replacing any previous socket.
    async fn connect(&mut self, url: &str) -> Result<()>;

    /// Sends one complete text frame.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Receives one complete text frame, blocking until a whole logical
    /// message is assembled.
    ///
    /// Returns `Ok(None)` on clean closure by either side.
    async fn receive(&mut self) -> Result<Option<String>>;

    /// Returns `true` while the socket is open from this side.
    fn is_open(&self) -> bool;

    /// Closes the socket. Idempotent; never errors.
    async fn close(&mut self);
}
