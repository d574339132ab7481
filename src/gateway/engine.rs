//! Gateway connection engine.
//!
//! Owns the protocol state machine for one shard: connect, identify or
//! resume, heartbeat supervision, opcode dispatch, and backoff-bounded
//! recovery after failures.
//!
//! # Event Loop
//!
//! [`Gateway::connect`] performs the first transport connect on the
//! caller's task (the only place connection errors surface directly),
//! then spawns a run loop that handles:
//!
//! - Inbound frames from the gateway (dispatch, hello, acks, ...)
//! - Outbound payloads from the public handle (presence, member requests)
//! - Heartbeat signals (send a ping / zombie detected)
//! - Reconnection with exponential backoff, preferring session resumption
//!
//! The run loop and the heartbeat timer are the only tasks touching the
//! connection; session and state fields they share sit behind mutexes in
//! [`Shared`]. Frames are processed strictly in arrival order.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::events::EventRouter;
use crate::heartbeat::{HeartbeatSignal, HeartbeatSupervisor};
use crate::presence::PresenceUpdate;
use crate::protocol::{GatewayFrame, HelloData, Opcode, ReadyData, outbound};
use crate::reconnect::{MAX_ATTEMPTS, ReconnectPolicy};
use crate::transport::{Transport, WebSocketTransport};

use super::state::{ConnectionState, SessionState};

// ============================================================================
// Types
// ============================================================================

/// Hook invoked on every connection state transition.
pub type StateHook = Arc<dyn Fn(ConnectionState, ConnectionState) + Send + Sync>;

/// Hook invoked with the attempt number before each reconnection dial.
pub type ReconnectHook = Arc<dyn Fn(u32) + Send + Sync>;

// ============================================================================
// Command
// ============================================================================

/// Commands from the public handle to the run loop.
enum Command {
    /// Send a wire-ready payload.
    Send(String),

    /// Clean, user-initiated teardown. Never triggers reconnection.
    Disconnect,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the run loop, the heartbeat task, and the
/// public handle.
pub(crate) struct Shared {
    /// Current connection state.
    state: Mutex<ConnectionState>,

    /// Session resumption bookkeeping.
    session: Mutex<SessionState>,

    /// Dispatch event fan-out.
    router: EventRouter,

    /// State transition observers.
    state_hooks: Mutex<Vec<StateHook>>,

    /// Reconnection attempt observers.
    attempt_hooks: Mutex<Vec<ReconnectHook>>,

    /// Terminal reconnection failure observers.
    failure_hooks: Mutex<Vec<ReconnectHook>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            session: Mutex::new(SessionState::default()),
            router: EventRouter::new(),
            state_hooks: Mutex::new(Vec::new()),
            attempt_hooks: Mutex::new(Vec::new()),
            failure_hooks: Mutex::new(Vec::new()),
        }
    }

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Transitions the state, notifying hooks outside the lock.
    fn set_state(&self, next: ConnectionState) {
        let previous = {
            let mut state = self.state.lock();
            if *state == next {
                return;
            }
            let previous = *state;
            *state = next;
            previous
        };

        debug!(from = %previous, to = %next, "Connection state changed");

        let hooks = self.state_hooks.lock().clone();
        for hook in hooks {
            hook(previous, next);
        }
    }

    /// Notifies reconnection-attempt observers.
    fn notify_attempt(&self, attempt: u32) {
        let hooks = self.attempt_hooks.lock().clone();
        for hook in hooks {
            hook(attempt);
        }
    }

    /// Notifies terminal-failure observers.
    fn notify_failure(&self, attempts: u32) {
        let hooks = self.failure_hooks.lock().clone();
        for hook in hooks {
            hook(attempts);
        }
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Handle to one live gateway connection.
///
/// Cheap to share by reference; all methods take `&self`. Dropping the
/// handle tears the connection down (the run loop exits when the command
/// channel closes).
pub struct Gateway {
    /// State shared with the run loop.
    shared: Arc<Shared>,

    /// Channel into the run loop.
    command_tx: mpsc::UnboundedSender<Command>,

    /// Run loop task, taken on disconnect.
    task: Mutex<Option<JoinHandle<()>>>,

    /// This connection's shard index.
    shard_id: u32,
}

impl Gateway {
    /// Connects a single unsharded gateway.
    ///
    /// # Errors
    ///
    /// Only the initial transport connect surfaces here; every later
    /// fault is handled internally through the reconnection supervisor
    /// and observable via the lifecycle hooks.
    pub async fn connect(config: GatewayConfig) -> Result<Self> {
        Self::connect_shard(config, 0).await
    }

    /// Connects one shard of a sharded deployment.
    pub async fn connect_shard(config: GatewayConfig, shard_id: u32) -> Result<Self> {
        Self::connect_with(Box::new(WebSocketTransport::new()), config, shard_id).await
    }

    /// Connects over a caller-supplied transport.
    pub(crate) async fn connect_with(
        mut transport: Box<dyn Transport>,
        config: GatewayConfig,
        shard_id: u32,
    ) -> Result<Self> {
        let shared = Arc::new(Shared::new());

        shared.set_state(ConnectionState::Connecting);
        let url = config.connect_url(None)?;
        if let Err(e) = transport.connect(&url).await {
            shared.set_state(ConnectionState::Disconnected);
            return Err(e);
        }
        shared.set_state(ConnectionState::Connected);
        info!(shard_id, "Gateway connected");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (beat_tx, beat_rx) = mpsc::unbounded_channel();

        let runner = Runner {
            config,
            shard_id,
            shared: Arc::clone(&shared),
            transport,
            command_rx,
            beat_tx,
            beat_rx,
            heartbeat: None,
            policy: ReconnectPolicy::new(),
        };
        let task = tokio::spawn(runner.run());

        Ok(Self {
            shared,
            command_tx,
            task: Mutex::new(Some(task)),
            shard_id,
        })
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Returns this connection's shard index.
    #[inline]
    #[must_use]
    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// Registers a typed handler for a dispatch event name.
    pub fn on<T, F>(&self, event_name: impl Into<String>, handler: F)
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.shared.router.on(event_name, handler);
    }

    /// Registers a raw handler receiving the untouched payload text.
    pub fn on_raw<F>(&self, event_name: impl Into<String>, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.router.on_raw(event_name, handler);
    }

    /// Registers a state transition observer.
    pub fn on_state_change<F>(&self, hook: F)
    where
        F: Fn(ConnectionState, ConnectionState) + Send + Sync + 'static,
    {
        self.shared.state_hooks.lock().push(Arc::new(hook));
    }

    /// Registers a reconnection-attempt observer.
    pub fn on_reconnect_attempt<F>(&self, hook: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.shared.attempt_hooks.lock().push(Arc::new(hook));
    }

    /// Registers a terminal reconnection-failure observer.
    pub fn on_reconnect_failure<F>(&self, hook: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.shared.failure_hooks.lock().push(Arc::new(hook));
    }

    /// Sends a presence update (opcode 3).
    ///
    /// Delivery is best-effort: an accepted payload that races a
    /// connection loss is dropped with a warning, not queued across the
    /// reconnect. Re-send after the connection reports `Ready` again.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] while the connection is down (including
    /// mid-reconnect); [`Error::ReconnectExhausted`] once the engine has
    /// failed terminally.
    pub fn update_presence(&self, presence: &PresenceUpdate) -> Result<()> {
        self.send_payload(outbound::presence_update(presence))
    }

    /// Requests a guild member list (opcode 8).
    ///
    /// Delivery is best-effort with the same contract as
    /// [`update_presence`](Self::update_presence).
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] while the connection is down (including
    /// mid-reconnect); [`Error::ReconnectExhausted`] once the engine has
    /// failed terminally.
    pub fn request_guild_members(&self, guild_id: u64, query: &str, limit: u32) -> Result<()> {
        self.send_payload(outbound::request_guild_members(guild_id, query, limit))
    }

    /// Cleanly disconnects and waits for the run loop to exit.
    ///
    /// Stops the heartbeat, cancels the receive loop, closes the
    /// transport, and settles in `Disconnected`. Never triggers the
    /// reconnection supervisor.
    pub async fn disconnect(&self) {
        let _ = self.command_tx.send(Command::Disconnect);

        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Queues a wire-ready payload for the run loop to send.
    fn send_payload(&self, payload: String) -> Result<()> {
        match self.shared.state() {
            ConnectionState::Failed => Err(Error::reconnect_exhausted(MAX_ATTEMPTS)),
            state if !state.is_connected() => Err(Error::NotConnected),
            _ => self
                .command_tx
                .send(Command::Send(payload))
                .map_err(|_| Error::ConnectionClosed),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("shard_id", &self.shard_id)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Runner
// ============================================================================

/// How an established connection's inner loop ended.
enum LoopExit {
    /// User asked for a clean teardown (or the handle was dropped).
    Disconnect,

    /// Transport fault, zombie heartbeat, or server-requested reconnect.
    ConnectionLost,
}

/// Per-frame verdict from the opcode table.
enum FrameStep {
    /// Keep receiving.
    Continue,

    /// Tear down and go through the reconnection supervisor.
    Reconnect,
}

/// Outcome of the recovery path.
enum RecoverOutcome {
    /// Transport is open again; redo the handshake.
    Reconnected,

    /// User disconnected during backoff.
    Disconnect,

    /// Budget exhausted; the engine is terminally failed.
    Exhausted,
}

/// The run loop: owns the transport and drives the state machine.
struct Runner {
    config: GatewayConfig,
    shard_id: u32,
    shared: Arc<Shared>,
    transport: Box<dyn Transport>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    /// Kept so heartbeat supervisors can be handed fresh senders and the
    /// receive side never reports closed.
    beat_tx: mpsc::UnboundedSender<HeartbeatSignal>,
    beat_rx: mpsc::UnboundedReceiver<HeartbeatSignal>,
    heartbeat: Option<HeartbeatSupervisor>,
    policy: ReconnectPolicy,
}

impl Runner {
    /// Drives the connection until clean disconnect or terminal failure.
    async fn run(mut self) {
        loop {
            let exit = match self.send_handshake().await {
                Ok(()) => self.drive().await,
                Err(e) => {
                    warn!(shard_id = self.shard_id, error = %e, "Handshake send failed");
                    LoopExit::ConnectionLost
                }
            };

            self.halt_heartbeat();
            self.transport.close().await;

            match exit {
                LoopExit::Disconnect => {
                    self.shared.set_state(ConnectionState::Disconnected);
                    info!(shard_id = self.shard_id, "Gateway disconnected");
                    return;
                }
                LoopExit::ConnectionLost => {
                    self.shared.set_state(ConnectionState::Connecting);
                    match self.recover().await {
                        RecoverOutcome::Reconnected => {}
                        RecoverOutcome::Disconnect => {
                            self.shared.set_state(ConnectionState::Disconnected);
                            info!(shard_id = self.shard_id, "Gateway disconnected");
                            return;
                        }
                        RecoverOutcome::Exhausted => {
                            let attempts = self.policy.attempts();
                            error!(
                                shard_id = self.shard_id,
                                attempts, "Reconnection exhausted; giving up"
                            );
                            self.shared.set_state(ConnectionState::Failed);
                            self.shared.notify_failure(attempts);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Sends resume when a session survives, identify otherwise.
    async fn send_handshake(&mut self) -> Result<()> {
        let session = self.shared.session.lock().clone();

        let payload = match &session.session_id {
            Some(session_id) => {
                debug!(
                    shard_id = self.shard_id,
                    session_id, seq = ?session.last_seq, "Resuming session"
                );
                outbound::resume(&self.config.token, session_id, session.last_seq)
            }
            None => {
                debug!(shard_id = self.shard_id, "Identifying as a new session");
                outbound::identify(&self.config.token, self.config.intents, self.shard_field())
            }
        };

        self.transport.send(payload).await
    }

    /// The `[shard_id, shard_count]` identify field, omitted unsharded.
    fn shard_field(&self) -> Option<[u32; 2]> {
        (self.config.shard_count() > 1).then(|| [self.shard_id, self.config.shard_count()])
    }

    /// Inner loop over one established connection.
    async fn drive(&mut self) -> LoopExit {
        loop {
            tokio::select! {
                inbound = self.transport.receive() => match inbound {
                    Ok(Some(text)) => match self.handle_frame(&text).await {
                        Ok(FrameStep::Continue) => {}
                        Ok(FrameStep::Reconnect) => return LoopExit::ConnectionLost,
                        Err(e) => {
                            warn!(shard_id = self.shard_id, error = %e, "Send failed on receive path");
                            return LoopExit::ConnectionLost;
                        }
                    },
                    Ok(None) => {
                        debug!(shard_id = self.shard_id, "Gateway closed the connection");
                        return LoopExit::ConnectionLost;
                    }
                    Err(e) => {
                        warn!(shard_id = self.shard_id, error = %e, "Receive error");
                        return LoopExit::ConnectionLost;
                    }
                },

                command = self.command_rx.recv() => match command {
                    Some(Command::Send(payload)) => {
                        if let Err(e) = self.transport.send(payload).await {
                            warn!(shard_id = self.shard_id, error = %e, "Send failed");
                            return LoopExit::ConnectionLost;
                        }
                    }
                    Some(Command::Disconnect) | None => return LoopExit::Disconnect,
                },

                signal = self.beat_rx.recv() => match signal {
                    Some(HeartbeatSignal::Beat) => {
                        let seq = self.shared.session.lock().last_seq;
                        if let Err(e) = self.transport.send(outbound::heartbeat(seq)).await {
                            warn!(shard_id = self.shard_id, error = %e, "Heartbeat send failed");
                            return LoopExit::ConnectionLost;
                        }
                        trace!(shard_id = self.shard_id, ?seq, "Heartbeat sent");
                    }
                    Some(HeartbeatSignal::Zombie) => {
                        warn!(shard_id = self.shard_id, "Zombie connection detected");
                        return LoopExit::ConnectionLost;
                    }
                    // A sender is held in `beat_tx`, so the channel never
                    // closes while the runner lives
                    None => {}
                },
            }
        }
    }

    /// Runs one inbound frame through the opcode table.
    async fn handle_frame(&mut self, text: &str) -> Result<FrameStep> {
        let frame = match GatewayFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                // Local fault: one bad frame never escalates to recovery
                warn!(shard_id = self.shard_id, error = %e, "Dropping malformed frame");
                return Ok(FrameStep::Continue);
            }
        };

        // Sequence numbers are tracked whenever present, whatever the opcode
        if let Some(seq) = frame.s {
            self.shared.session.lock().last_seq = Some(seq);
        }

        let Some(opcode) = frame.opcode() else {
            trace!(shard_id = self.shard_id, op = frame.op, "Ignoring unknown opcode");
            return Ok(FrameStep::Continue);
        };

        match opcode {
            Opcode::Dispatch => self.handle_dispatch(&frame),

            Opcode::Heartbeat => {
                // Server asked for an out-of-cycle ping
                let seq = self.shared.session.lock().last_seq;
                self.transport.send(outbound::heartbeat(seq)).await?;
            }

            Opcode::Reconnect => {
                info!(shard_id = self.shard_id, "Server requested reconnect");
                return Ok(FrameStep::Reconnect);
            }

            Opcode::InvalidSession => {
                warn!(shard_id = self.shard_id, "Session invalidated by server");
                self.shared.session.lock().clear();
                // Re-identify on the spot; resumption is explicitly off
                self.send_handshake().await?;
            }

            Opcode::Hello => match frame.data_as::<HelloData>() {
                Ok(hello) => self.restart_heartbeat(Duration::from_millis(hello.heartbeat_interval)),
                Err(e) => {
                    warn!(shard_id = self.shard_id, error = %e, "Malformed hello payload")
                }
            },

            Opcode::HeartbeatAck => {
                trace!(shard_id = self.shard_id, "Heartbeat acknowledged");
                if let Some(heartbeat) = &self.heartbeat {
                    heartbeat.ack();
                }
            }

            // Outbound-only opcodes have no inbound meaning
            Opcode::Identify
            | Opcode::PresenceUpdate
            | Opcode::Resume
            | Opcode::RequestGuildMembers => {
                trace!(shard_id = self.shard_id, op = frame.op, "Ignoring outbound-only opcode");
            }
        }

        Ok(FrameStep::Continue)
    }

    /// Handles an opcode 0 frame: session capture, then router fan-out.
    fn handle_dispatch(&mut self, frame: &GatewayFrame) {
        let Some(event_name) = frame.t.as_deref() else {
            trace!(shard_id = self.shard_id, "Dispatch frame without event name");
            return;
        };

        match event_name {
            "READY" => match frame.data_as::<ReadyData>() {
                Ok(ready) => {
                    info!(
                        shard_id = self.shard_id,
                        session_id = %ready.session_id, "Session ready"
                    );
                    {
                        let mut session = self.shared.session.lock();
                        session.session_id = Some(ready.session_id);
                        session.resume_url = ready.resume_gateway_url;
                    }
                    self.policy.reset();
                    self.shared.set_state(ConnectionState::Ready);
                }
                Err(e) => {
                    warn!(shard_id = self.shard_id, error = %e, "Malformed READY payload")
                }
            },
            "RESUMED" => {
                info!(shard_id = self.shard_id, "Session resumed");
                self.policy.reset();
                self.shared.set_state(ConnectionState::Ready);
            }
            _ => {}
        }

        self.shared.router.dispatch(event_name, frame.data());
    }

    /// Replaces the heartbeat supervisor with one at the new interval.
    fn restart_heartbeat(&mut self, interval: Duration) {
        if interval.is_zero() {
            warn!(shard_id = self.shard_id, "Ignoring zero heartbeat interval");
            return;
        }

        self.halt_heartbeat();
        self.heartbeat = Some(HeartbeatSupervisor::start(interval, self.beat_tx.clone()));
    }

    /// Stops the heartbeat supervisor and discards stale signals.
    fn halt_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        // A tick queued by the old supervisor must not outlive it; a stale
        // zombie would tear down a healthy replacement connection
        while self.beat_rx.try_recv().is_ok() {}
    }

    /// Backoff-paced redial loop. Sleeps are cancellable by disconnect.
    async fn recover(&mut self) -> RecoverOutcome {
        loop {
            let Some((attempt, delay)) = self.policy.next_attempt() else {
                return RecoverOutcome::Exhausted;
            };

            debug!(
                shard_id = self.shard_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Backing off before reconnect"
            );

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    () = &mut sleep => break,
                    command = self.command_rx.recv() => match command {
                        Some(Command::Disconnect) | None => return RecoverOutcome::Disconnect,
                        Some(Command::Send(_)) => {
                            warn!(shard_id = self.shard_id, "Dropping payload while reconnecting");
                        }
                    },
                }
            }

            self.shared.notify_attempt(attempt);

            let endpoint = {
                let session = self.shared.session.lock();
                if session.can_resume() {
                    session.resume_url.clone()
                } else {
                    None
                }
            };
            let url = match self.config.connect_url(endpoint.as_deref()) {
                Ok(url) => url,
                Err(e) => {
                    warn!(shard_id = self.shard_id, error = %e, "Bad resume endpoint");
                    self.shared.session.lock().resume_url = None;
                    continue;
                }
            };

            match self.transport.connect(&url).await {
                Ok(()) => {
                    self.shared.set_state(ConnectionState::Connected);
                    info!(shard_id = self.shard_id, attempt, "Reconnected");
                    return RecoverOutcome::Reconnected;
                }
                Err(e) => {
                    warn!(shard_id = self.shard_id, attempt, error = %e, "Reconnect failed");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::Value;

    use crate::testing::{Inbound, ScriptedTransport};

    fn test_config() -> GatewayConfig {
        GatewayConfig::builder().token("test-token").build().unwrap()
    }

    /// Lets the paused runtime drain the engine's pending work.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    const HELLO: &str = r#"{"op":10,"d":{"heartbeat_interval":45000}}"#;
    const READY: &str =
        r#"{"op":0,"t":"READY","s":1,"d":{"session_id":"abc","resume_gateway_url":"wss://resume.example.com"}}"#;

    #[tokio::test(start_paused = true)]
    async fn test_identify_sent_on_connect() {
        let (transport, probe) = ScriptedTransport::new(vec![Inbound::Frame(HELLO)]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();
        settle().await;

        let sent = probe.sent.lock().clone();
        let identify: Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(identify["op"], 2);
        assert_eq!(identify["d"]["token"], "test-token");
        assert!(identify["d"].get("shard").is_none());

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sharded_identify_carries_shard_field() {
        let config = GatewayConfig::builder()
            .token("test-token")
            .shard_count(4)
            .build()
            .unwrap();
        let (transport, probe) = ScriptedTransport::new(vec![]);
        let gateway = Gateway::connect_with(transport, config, 2).await.unwrap();
        settle().await;

        let first: Value = serde_json::from_str(&probe.sent.lock()[0]).unwrap();
        assert_eq!(first["d"]["shard"], serde_json::json!([2, 4]));

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_starts_heartbeat_at_interval() {
        let (transport, probe) = ScriptedTransport::new(vec![Inbound::Frame(HELLO)]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();
        settle().await;
        assert_eq!(probe.sent_ops(), vec![2]);

        // One full interval later the first ping goes out
        tokio::time::sleep(Duration::from_millis(45_001)).await;
        assert_eq!(probe.sent_ops(), vec![2, 1]);

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_reaches_ready_state() {
        let (transport, _probe) =
            ScriptedTransport::new(vec![Inbound::Frame(HELLO), Inbound::Frame(READY)]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();
        settle().await;

        assert_eq!(gateway.state(), ConnectionState::Ready);
        gateway.disconnect().await;
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_after_transport_failure() {
        let (transport, probe) = ScriptedTransport::new(vec![
            Inbound::Frame(HELLO),
            Inbound::Frame(READY),
            Inbound::Fault,
        ]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();

        // Backoff is 1s; give the paused clock room to run it
        tokio::time::sleep(Duration::from_secs(2)).await;

        let resume = probe.last_sent();
        assert_eq!(resume["op"], 6);
        assert_eq!(resume["d"]["session_id"], "abc");
        assert_eq!(resume["d"]["seq"], 1);
        assert_eq!(probe.connects.load(Ordering::SeqCst), 2);

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_session_forces_identify() {
        let (transport, probe) = ScriptedTransport::new(vec![
            Inbound::Frame(HELLO),
            Inbound::Frame(READY),
            Inbound::Frame(r#"{"op":9}"#),
        ]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();
        settle().await;

        let handshake = probe.last_sent();
        assert_eq!(handshake["op"], 2);
        // Resume never went out
        assert!(!probe.sent_ops().contains(&6));

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_heartbeat_request_answered_immediately() {
        let (transport, probe) = ScriptedTransport::new(vec![
            Inbound::Frame(r#"{"op":0,"t":"X","s":7,"d":{}}"#),
            Inbound::Frame(r#"{"op":1}"#),
        ]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();
        settle().await;

        let heartbeat = probe.last_sent();
        assert_eq!(heartbeat["op"], 1);
        assert_eq!(heartbeat["d"], 7);

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_reconnect_request_goes_through_supervisor() {
        let (transport, probe) = ScriptedTransport::new(vec![
            Inbound::Frame(HELLO),
            Inbound::Frame(READY),
            Inbound::Frame(r#"{"op":7}"#),
        ]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);
        gateway.on_reconnect_attempt(move |_| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(probe.connects.load(Ordering::SeqCst), 2);

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_disconnect_never_reconnects() {
        let (transport, probe) =
            ScriptedTransport::new(vec![Inbound::Frame(HELLO), Inbound::Frame(READY)]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);
        gateway.on_reconnect_attempt(move |_| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
        });

        settle().await;
        assert_eq!(gateway.state(), ConnectionState::Ready);

        gateway.disconnect().await;
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert_eq!(probe.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_reconnection_fails_terminally() {
        let (transport, _probe) = ScriptedTransport::new(vec![Inbound::Closed]);
        let transport = transport
            .with_connect_results(std::iter::once(Ok(()))
                .chain((0..10).map(|_| Err(Error::connection("refused"))))
                .collect());
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();

        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = Arc::clone(&failures);
        gateway.on_reconnect_failure(move |attempts| {
            assert_eq!(attempts, 10);
            failures_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Total backoff is 1+2+4+8+16*6 = 111s of paused time
        tokio::time::sleep(Duration::from_secs(150)).await;

        assert_eq!(gateway.state(), ConnectionState::Failed);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zombie_heartbeat_triggers_reconnect() {
        // Short interval, no acks scripted: two unanswered pings
        let (transport, probe) = ScriptedTransport::new(vec![Inbound::Frame(
            r#"{"op":10,"d":{"heartbeat_interval":100}}"#,
        )]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);
        gateway.on_reconnect_attempt(move |_| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(attempts.load(Ordering::SeqCst) >= 1);
        assert!(probe.connects.load(Ordering::SeqCst) >= 2);

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_routes_to_handlers() {
        let (transport, _probe) = ScriptedTransport::new(vec![
            Inbound::Frame(HELLO),
            Inbound::Frame(r#"{"op":0,"t":"MESSAGE_CREATE","s":2,"d":{"content":"hi"}}"#),
        ]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        gateway.on_raw("MESSAGE_CREATE", move |raw| {
            seen_clone.lock().push(raw.to_string());
        });

        settle().await;
        assert_eq!(seen.lock().clone(), vec![r#"{"content":"hi"}"#.to_string()]);

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_hooks_observe_transitions() {
        let (transport, _probe) =
            ScriptedTransport::new(vec![Inbound::Frame(HELLO), Inbound::Frame(READY)]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();

        let transitions = Arc::new(Mutex::new(Vec::new()));
        let transitions_clone = Arc::clone(&transitions);
        gateway.on_state_change(move |from, to| {
            transitions_clone.lock().push((from, to));
        });

        settle().await;
        gateway.disconnect().await;

        let seen = transitions.lock().clone();
        assert_eq!(
            seen,
            vec![
                (ConnectionState::Connected, ConnectionState::Ready),
                (ConnectionState::Ready, ConnectionState::Disconnected),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_presence_goes_over_the_wire() {
        use crate::presence::StatusKind;

        let (transport, probe) =
            ScriptedTransport::new(vec![Inbound::Frame(HELLO), Inbound::Frame(READY)]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();
        settle().await;

        gateway
            .update_presence(&PresenceUpdate::new(StatusKind::Idle))
            .unwrap();
        settle().await;

        let presence = probe.last_sent();
        assert_eq!(presence["op"], 3);
        assert_eq!(presence["d"]["status"], "idle");

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_disconnected_is_rejected() {
        use crate::presence::StatusKind;

        let (transport, _probe) = ScriptedTransport::new(vec![Inbound::Frame(HELLO)]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();
        gateway.disconnect().await;

        let err = gateway
            .update_presence(&PresenceUpdate::new(StatusKind::Online))
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_reconnecting_is_rejected() {
        use crate::presence::StatusKind;

        let (transport, _probe) = ScriptedTransport::new(vec![
            Inbound::Frame(HELLO),
            Inbound::Frame(READY),
            Inbound::Fault,
        ]);
        let gateway = Gateway::connect_with(transport, test_config(), 0).await.unwrap();

        // Mid-backoff: the fault lands immediately, the first redial
        // waits 1s
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(gateway.state(), ConnectionState::Connecting);

        let err = gateway
            .update_presence(&PresenceUpdate::new(StatusKind::Online))
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));

        gateway.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_connect_error_surfaces() {
        let (transport, _probe) = ScriptedTransport::new(vec![]);
        let transport =
            transport.with_connect_results(vec![Err(Error::connection("refused"))]);

        let result = Gateway::connect_with(transport, test_config(), 0).await;
        assert!(result.is_err());
    }
}
