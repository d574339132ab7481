//! Shared scenario-test support.
//!
//! A scripted [`Transport`] that feeds canned inbound items to an engine
//! and records everything sent through it, plus one-time tracing setup
//! for the test binary.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::Transport;

// ============================================================================
// Tracing
// ============================================================================

/// Installs the fmt subscriber once, honoring `RUST_LOG`.
///
/// Later calls are no-ops; safe from every test.
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Script
// ============================================================================

/// Scripted inbound items for the mock transport.
pub(crate) enum Inbound {
    /// One complete text frame.
    Frame(&'static str),

    /// Clean closure by the peer.
    Closed,

    /// Transport-level receive error.
    Fault,
}

// ============================================================================
// Probe
// ============================================================================

/// Shared observation side of the mock transport.
#[derive(Default)]
pub(crate) struct Probe {
    /// Every payload sent, in order.
    pub(crate) sent: Mutex<Vec<String>>,

    /// Number of connect calls, initial dial included.
    pub(crate) connects: AtomicUsize,
}

impl Probe {
    /// Returns the `op` of every sent frame, in order.
    pub(crate) fn sent_ops(&self) -> Vec<u64> {
        self.sent
            .lock()
            .iter()
            .map(|text| {
                let frame: Value = serde_json::from_str(text).unwrap();
                frame["op"].as_u64().unwrap()
            })
            .collect()
    }

    /// Returns the most recently sent frame, parsed.
    pub(crate) fn last_sent(&self) -> Value {
        serde_json::from_str(self.sent.lock().last().unwrap()).unwrap()
    }
}

// ============================================================================
// ScriptedTransport
// ============================================================================

/// Transport fed from a script; hangs forever once drained.
pub(crate) struct ScriptedTransport {
    script: VecDeque<Inbound>,
    connect_results: VecDeque<Result<()>>,
    probe: Arc<Probe>,
    open: bool,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Inbound>) -> (Box<Self>, Arc<Probe>) {
        init_tracing();

        let probe = Arc::new(Probe::default());
        let transport = Box::new(Self {
            script: script.into(),
            connect_results: VecDeque::new(),
            probe: Arc::clone(&probe),
            open: false,
        });
        (transport, probe)
    }

    /// Scripts the outcome of successive connect calls; once the list is
    /// drained further connects succeed.
    pub(crate) fn with_connect_results(
        mut self: Box<Self>,
        results: Vec<Result<()>>,
    ) -> Box<Self> {
        self.connect_results = results.into();
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self, _url: &str) -> Result<()> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        match self.connect_results.pop_front() {
            Some(Err(e)) => Err(e),
            _ => {
                self.open = true;
                Ok(())
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<()> {
        self.probe.sent.lock().push(text);
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<String>> {
        match self.script.pop_front() {
            Some(Inbound::Frame(text)) => Ok(Some(text.to_string())),
            Some(Inbound::Closed) => Ok(None),
            Some(Inbound::Fault) => Err(Error::ConnectionClosed),
            None => std::future::pending().await,
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) {
        self.open = false;
    }
}
