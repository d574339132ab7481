//! Reconnection budget and exponential backoff.
//!
//! Recovering the transport after a failure (or a server-requested
//! reconnect) is bounded: at most [`MAX_ATTEMPTS`] tries, with delays
//! doubling from [`INITIAL_BACKOFF`] up to the [`MAX_BACKOFF`] ceiling.
//! The schedule is deterministic, with no jitter:
//! 1000, 2000, 4000, 8000, 16000, 16000, ... ms.
//!
//! The engine performs the actual (cancellable) sleep; this type only
//! owns the budget arithmetic so the schedule is testable without time.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Hard cap on reconnection attempts before the engine fails terminally.
pub const MAX_ATTEMPTS: u32 = 10;

/// Delay before the first reconnection attempt.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Ceiling on the doubling backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_millis(16000);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Bounded-attempt exponential backoff state for one engine.
///
/// Reset to initial values only once a connection reaches `Ready`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Attempts consumed since the last reset.
    attempts: u32,

    /// Delay the next attempt will wait.
    current_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectPolicy {
    /// Creates a fresh budget.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: 0,
            current_backoff: INITIAL_BACKOFF,
        }
    }

    /// Returns the number of attempts consumed since the last reset.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns `true` while the budget allows another attempt.
    #[inline]
    #[must_use]
    pub fn can_reconnect(&self) -> bool {
        self.attempts < MAX_ATTEMPTS
    }

    /// Consumes one attempt from the budget.
    ///
    /// Returns the attempt number and the delay to sleep before dialing,
    /// or `None` - without consuming anything - once the budget is
    /// exhausted. The caller is expected to surface the terminal failure
    /// and stop retrying.
    pub fn next_attempt(&mut self) -> Option<(u32, Duration)> {
        if !self.can_reconnect() {
            return None;
        }

        self.attempts += 1;
        let delay = self.current_backoff;
        self.current_backoff = (self.current_backoff * 2).min(MAX_BACKOFF);

        Some((self.attempts, delay))
    }

    /// Restores the full budget and the initial delay.
    ///
    /// Called only after a connection reaches `Ready`.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_backoff = INITIAL_BACKOFF;
    }
}

// ============================================================================
// Tests
// ============================================================================
