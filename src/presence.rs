//! Outbound presence types.
//!
//! A presence update tells the gateway what status and activities to show
//! for this connection. Sent as the payload of opcode 3.
//!
//! # Example
//!
//! ```
//! use shardline::{Activity, PresenceUpdate, StatusKind};
//!
//! let presence = PresenceUpdate::new(StatusKind::Idle)
//!     .activity(Activity::playing("a game"))
//!     .afk(true);
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// StatusKind
// ============================================================================

/// Online status shown for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// Shown as online.
    Online,
    /// Shown as idle.
    Idle,
    /// Shown as do-not-disturb.
    Dnd,
    /// Connected but shown as offline.
    Invisible,
    /// Shown as offline.
    Offline,
}

// ============================================================================
// Activity
// ============================================================================

/// A single activity entry in a presence update.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    /// Display name of the activity.
    pub name: String,

    /// Wire activity type (0 = playing, 2 = listening, 3 = watching,
    /// 4 = custom, 5 = competing).
    #[serde(rename = "type")]
    pub kind: u8,
}

impl Activity {
    /// Creates a "playing" activity.
    #[inline]
    #[must_use]
    pub fn playing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: 0,
        }
    }

    /// Creates a "listening" activity.
    #[inline]
    #[must_use]
    pub fn listening(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: 2,
        }
    }

    /// Creates a "watching" activity.
    #[inline]
    #[must_use]
    pub fn watching(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: 3,
        }
    }

    /// Creates a "competing" activity.
    #[inline]
    #[must_use]
    pub fn competing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: 5,
        }
    }
}

// ============================================================================
// PresenceUpdate
// ============================================================================

/// Payload of an outbound presence update (opcode 3).
#[derive(Debug, Clone, Serialize)]
pub struct PresenceUpdate {
    /// Unix timestamp (ms) the client went idle, if it did.
    pub since: Option<u64>,

    /// Activities to display, in order.
    pub activities: Vec<Activity>,

    /// Online status.
    pub status: StatusKind,

    /// Whether the client is marked away.
    pub afk: bool,
}

impl PresenceUpdate {
    /// Creates a presence update with no activities.
    #[inline]
    #[must_use]
    pub fn new(status: StatusKind) -> Self {
        Self {
            since: None,
            activities: Vec::new(),
            status,
            afk: false,
        }
    }

    /// Appends an activity.
    #[inline]
    #[must_use]
    pub fn activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    /// Sets the idle-since timestamp.
    #[inline]
    #[must_use]
    pub fn since(mut self, since: u64) -> Self {
        self.since = Some(since);
        self
    }

    /// Sets the away flag.
    #[inline]
    #[must_use]
    pub fn afk(mut self, afk: bool) -> Self {
        self.afk = afk;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
