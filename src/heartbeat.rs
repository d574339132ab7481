//! Heartbeat supervision and zombie detection.
//!
//! The gateway dictates a heartbeat interval in its hello frame. Each
//! tick the supervisor asks the engine to send a liveness ping and,
//! critically, checks whether the *previous* ping was ever acknowledged.
//! Two consecutive unacknowledged pings mean the peer has silently
//! stopped answering: the socket looks open but the connection is dead.
//!
//! A ping is meaningless once the peer has stopped answering, so a
//! qualifying tick raises the zombie signal instead of sending another
//! ping, and the supervisor exits. The engine treats the signal exactly
//! like a transport error.
//!
//! Interval renegotiation replaces the supervisor wholesale: the old
//! timer task is stopped and a fresh one started, so a stale tick can
//! never race the new configuration.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

/// Consecutive unacknowledged pings before the connection is presumed dead.
const MAX_MISSED_ACKS: u32 = 2;

// ============================================================================
// Signals
// ============================================================================

/// Signal from the heartbeat task to the engine's run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeartbeatSignal {
    /// Send a liveness ping carrying the last seen sequence number.
    Beat,

    /// The peer stopped acknowledging; tear down and reconnect.
    Zombie,
}

// ============================================================================
// HeartbeatState
// ============================================================================

/// Per-tick outcome of the liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Send a ping this tick.
    Beat,

    /// Connection presumed dead; no ping.
    Zombie,
}

/// Acknowledgement bookkeeping between ticks.
///
/// Kept separate from the timer task so the missed-ack rule is testable
/// without time.
#[derive(Debug, Default)]
pub(crate) struct HeartbeatState {
    /// Whether the previous ping is still unacknowledged.
    ack_pending: bool,

    /// Consecutive ticks the previous ping went unacknowledged.
    missed: u32,
}

impl HeartbeatState {
    /// Creates fresh state with no ping outstanding.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Advances one tick and returns what to do.
    pub(crate) fn tick(&mut self) -> TickOutcome {
        if self.ack_pending {
            self.missed += 1;
            if self.missed >= MAX_MISSED_ACKS {
                return TickOutcome::Zombie;
            }
        }

        self.ack_pending = true;
        TickOutcome::Beat
    }

    /// Records an acknowledgement from the gateway.
    pub(crate) fn ack(&mut self) {
        self.ack_pending = false;
        self.missed = 0;
    }

    /// Returns the current missed-ack count.
    #[cfg(test)]
    pub(crate) fn missed(&self) -> u32 {
        self.missed
    }
}

// ============================================================================
// HeartbeatSupervisor
// ============================================================================

/// Periodic timer driving the liveness checks for one connection.
///
/// Lifecycle is `start` then `stop`; a hello frame renegotiating the
/// interval stops the old supervisor and starts a new one.
#[derive(Debug)]
pub(crate) struct HeartbeatSupervisor {
    /// Acknowledgement state shared with the timer task.
    state: Arc<Mutex<HeartbeatState>>,

    /// The timer task.
    handle: JoinHandle<()>,
}

impl HeartbeatSupervisor {
    /// Starts a timer task ticking at `interval`.
    ///
    /// Each tick pushes a [`HeartbeatSignal`] to the engine; the task
    /// exits after raising [`HeartbeatSignal::Zombie`] or once the engine
    /// side of the channel is gone.
    pub(crate) fn start(
        interval: Duration,
        signal_tx: mpsc::UnboundedSender<HeartbeatSignal>,
    ) -> Self {
        debug!(interval_ms = interval.as_millis() as u64, "Starting heartbeat");

        let state = Arc::new(Mutex::new(HeartbeatState::new()));
        let task_state = Arc::clone(&state);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately;
            // the first ping belongs one full interval after hello
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let outcome = task_state.lock().tick();
                match outcome {
                    TickOutcome::Beat => {
                        if signal_tx.send(HeartbeatSignal::Beat).is_err() {
                            break;
                        }
                    }
                    TickOutcome::Zombie => {
                        warn!("Two heartbeats unacknowledged; presuming zombie connection");
                        let _ = signal_tx.send(HeartbeatSignal::Zombie);
                        break;
                    }
                }
            }
        });

        Self { state, handle }
    }

    /// Records an acknowledgement (opcode 11).
    pub(crate) fn ack(&self) {
        self.state.lock().ack();
    }

    /// Stops the timer task.
    pub(crate) fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for HeartbeatSupervisor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================
