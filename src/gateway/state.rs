//! Connection state and session bookkeeping.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of one gateway connection.
///
/// Transitions are one-directional except `Ready -> Disconnected`
/// (explicit disconnect) and any state back to `Connecting` (reconnect).
/// [`Failed`](ConnectionState::Failed) is terminal and reachable only by
/// exhausting the reconnection budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket open.
    Disconnected,
    /// Dialing the gateway.
    Connecting,
    /// Socket open, handshake sent, `READY`/`RESUMED` not yet seen.
    Connected,
    /// Fully operational; dispatch events are flowing.
    Ready,
    /// Reconnection exhausted; no further automatic attempts.
    Failed,
}

impl ConnectionState {
    /// Returns `true` while the socket is usable for outbound payloads.
    #[inline]
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Ready)
    }

    /// Returns the state name as it appears in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Resumption bookkeeping for one connection.
///
/// Populated from the `READY` dispatch, cleared when the server
/// invalidates the session (opcode 9). Mutated only on the engine's
/// receive path; read by the reconnection path to decide
/// identify-vs-resume.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    /// Opaque session identifier from `READY`.
    pub(crate) session_id: Option<String>,

    /// Endpoint to resume against, if the server provided one.
    pub(crate) resume_url: Option<String>,

    /// Last sequence number seen on any frame. Best-effort: missing or
    /// out-of-order values only degrade resumption precision.
    pub(crate) last_seq: Option<u64>,
}

impl SessionState {
    /// Returns `true` when a resume frame can be built.
    #[inline]
    pub(crate) fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Discards the session entirely, forcing the next handshake to be a
    /// full identify.
    pub(crate) fn clear(&mut self) {
        self.session_id = None;
        self.resume_url = None;
        self.last_seq = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
