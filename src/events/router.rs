//! Handler registry and dispatch.
//!
//! Maps a dispatch event name to an ordered list of consumers, each
//! either typed (deserialized payload) or raw (untouched JSON text).
//! Dispatch is synchronous, preserves registration order, and isolates
//! one consumer's failure from the rest.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use tracing::{error, trace, warn};

// ============================================================================
// Types
// ============================================================================

/// Map of event names to registered consumers, in insertion order.
type HandlerMap = FxHashMap<String, Vec<Arc<Registration>>>;

/// A single registered consumer.
enum Registration {
    /// Deserializes the payload before invoking; a payload that does not
    /// fit the expected shape skips this consumer only.
    Typed(Box<dyn Fn(&str) -> Result<(), serde_json::Error> + Send + Sync>),

    /// Receives the payload text untouched.
    Raw(Box<dyn Fn(&str) + Send + Sync>),
}

// ============================================================================
// EventRouter
// ============================================================================

/// Registry mapping event names to consumer callbacks.
///
/// # Thread Safety
///
/// Registration may race with dispatch: handlers are snapshotted under a
/// read lock before invocation, so a handler registered mid-dispatch is
/// picked up by the next event.
#[derive(Default)]
pub struct EventRouter {
    /// Registered consumers, keyed by event name.
    handlers: RwLock<HandlerMap>,
}

impl EventRouter {
    /// Creates an empty router.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed handler for an event name.
    ///
    /// The payload is deserialized into `T` per invocation; on failure
    /// the handler is skipped with a warning while raw handlers for the
    /// same event still run.
    pub fn on<T, F>(&self, event_name: impl Into<String>, handler: F)
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let typed = Registration::Typed(Box::new(move |raw| {
            let payload: T = serde_json::from_str(raw)?;
            handler(payload);
            Ok(())
        }));

        self.register(event_name.into(), typed);
    }

    /// Registers a raw handler receiving the untouched payload text.
    pub fn on_raw<F>(&self, event_name: impl Into<String>, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.register(event_name.into(), Registration::Raw(Box::new(handler)));
    }

    /// Invokes every consumer registered for `event_name`, in
    /// registration order.
    ///
    /// Never blocks on I/O. A consumer that panics is caught and logged;
    /// the remaining consumers still run.
    pub fn dispatch(&self, event_name: &str, raw_json: &str) {
        // Snapshot so user handlers run outside the lock and may register
        // new handlers without deadlocking
        let snapshot: Vec<Arc<Registration>> = {
            let handlers = self.handlers.read();
            match handlers.get(event_name) {
                Some(list) => list.clone(),
                None => {
                    trace!(event = event_name, "No handlers registered");
                    return;
                }
            }
        };

        for registration in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| match registration.as_ref() {
                Registration::Typed(invoke) => {
                    if let Err(e) = invoke(raw_json) {
                        warn!(
                            event = event_name,
                            error = %e,
                            "Payload did not fit typed handler; skipping"
                        );
                    }
                }
                Registration::Raw(invoke) => invoke(raw_json),
            }));

            if outcome.is_err() {
                error!(event = event_name, "Event handler panicked");
            }
        }
    }

    /// Returns the number of consumers registered for an event name.
    #[must_use]
    pub fn handler_count(&self, event_name: &str) -> usize {
        self.handlers.read().get(event_name).map_or(0, Vec::len)
    }

    /// Registers a consumer at the end of the event's list.
    fn register(&self, event_name: String, registration: Registration) {
        let mut handlers = self.handlers.write();
        handlers
            .entry(event_name)
            .or_default()
            .push(Arc::new(registration));
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("EventRouter")
            .field("event_names", &handlers.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
