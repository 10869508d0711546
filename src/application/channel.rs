//! Transport channel: one persistent session connection.
//!
//! A `TransportChannel` owns at most one background task. The task connects,
//! pumps commands and frames, sends the heartbeat, and reconnects after a
//! fixed delay until the channel is closed.
//!
//! ```text
//!   open() ──► Connecting ──► Connected ──(drop)──► Disconnected ──(delay)──┐
//!                  ▲   │                                                     │
//!                  │   └──(connect failed)──► Error ──(delay)────────────────┤
//!                  └─────────────────────────────────────────────────────────┘
//!   close() from any state ──► Disconnected (no further traffic, no retries)
//! ```
//!
//! Inbound frames are handed to an `InboundHandler` one at a time, on the
//! loop task, and each is handled to completion before the next is read.

use reqwest::Url;
use std::future::pending;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior, Sleep};
use tracing::{debug, error, info, warn};

use super::subscribers::{Listeners, SubscriptionId};
use crate::adapters::websocket::{encode, ClientCommand};
use crate::domain::foundation::{ConnectionId, ConnectionState, Credential, ValidationError};
use crate::ports::{Connector, Transport, TransportError};

/// Endpoint used when none is configured.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/game/";

/// Timing and endpoint settings for a channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Session endpoint. The credential is appended as `?token=`.
    pub ws_url: String,
    /// Fixed wait before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Period of the `trigger_game_session_manager` heartbeat.
    pub heartbeat_interval: Duration,
    /// Wait after a round result before asking for the next round.
    pub post_outcome_poll_delay: Duration,
    /// Upper bound on a graceful socket close.
    pub close_timeout: Duration,
}

impl ChannelConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            reconnect_delay: Duration::from_secs(2),
            heartbeat_interval: Duration::from_secs(1),
            post_outcome_poll_delay: Duration::from_secs(5),
            close_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_post_outcome_poll_delay(mut self, delay: Duration) -> Self {
        self.post_outcome_poll_delay = delay;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WS_URL)
    }
}

/// What the loop should do after a frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFollowUp {
    Nothing,
    /// Schedule one `trigger_game_session_manager` after the poll delay.
    PollAfterOutcome,
}

/// Receives everything the loop reads off the connection.
///
/// Called from the loop task. Implementations must not block.
pub trait InboundHandler: Send + Sync {
    /// Handles one text frame.
    fn handle_frame(&self, text: &str, outbound: &Outbound) -> FrameFollowUp;

    /// A connect attempt or an open connection failed.
    fn on_transport_error(&self, error: &TransportError);

    /// An established connection was lost. Not called after `close()`.
    fn on_disconnect(&self);
}

/// Command queue of one loop generation.
#[derive(Clone)]
pub struct Outbound {
    commands: mpsc::UnboundedSender<ClientCommand>,
    closed: Arc<AtomicBool>,
}

impl Outbound {
    /// Queues a command. Returns false once the channel is closed.
    pub fn send(&self, command: ClientCommand) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.commands.send(command).is_ok()
    }
}

struct StateCell {
    generation: u64,
    state: ConnectionState,
}

struct Shared {
    cell: Mutex<StateCell>,
    listeners: Listeners<ConnectionState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StateCell> {
        self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state(&self) -> ConnectionState {
        self.lock().state.clone()
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Starts a new generation. Returns it and whether the state changed.
    fn advance(&self, state: ConnectionState) -> (u64, bool) {
        let mut cell = self.lock();
        cell.generation += 1;
        let changed = cell.state != state;
        cell.state = state;
        (cell.generation, changed)
    }

    /// Updates the state on behalf of a loop, unless it was superseded.
    fn set_state(&self, generation: u64, state: ConnectionState) {
        {
            let mut cell = self.lock();
            if cell.generation != generation || cell.state == state {
                return;
            }
            cell.state = state.clone();
        }
        self.listeners.notify(&state);
    }
}

struct Running {
    closed: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    credential: Option<Credential>,
}

impl Running {
    fn stop(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
    }
}

/// Persistent connection to the session server.
pub struct TransportChannel {
    config: ChannelConfig,
    base_url: Url,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn InboundHandler>,
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
    outbound: Mutex<Option<Outbound>>,
}

impl TransportChannel {
    /// Creates a closed channel. Fails if `ws_url` is not a ws/wss URL.
    pub fn new(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<Self, ValidationError> {
        let base_url = parse_ws_url(&config.ws_url)?;
        Ok(Self {
            config,
            base_url,
            connector,
            handler,
            shared: Arc::new(Shared {
                cell: Mutex::new(StateCell {
                    generation: 0,
                    state: ConnectionState::Disconnected,
                }),
                listeners: Listeners::new(),
            }),
            running: Mutex::new(None),
            outbound: Mutex::new(None),
        })
    }

    /// Opens the connection, replacing any existing one.
    ///
    /// Must be called within a tokio runtime.
    pub fn open(&self, credential: Option<Credential>) {
        let previous = self.lock_running().take();
        if let Some(previous) = &previous {
            previous.stop();
        }

        let (generation, changed) = self.shared.advance(ConnectionState::Connecting);
        if changed {
            self.shared.listeners.notify(&ConnectionState::Connecting);
        }

        let mut running = self.lock_running();
        // A listener closed or reopened the channel during the notification
        if self.shared.generation() != generation {
            return;
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let closed = Arc::new(AtomicBool::new(false));
        let outbound = Outbound {
            commands: commands_tx,
            closed: closed.clone(),
        };

        let context = LoopContext {
            generation,
            url: self.connect_url(credential.as_ref()),
            endpoint: self.config.ws_url.clone(),
            connector: self.connector.clone(),
            handler: self.handler.clone(),
            shared: self.shared.clone(),
            config: self.config.clone(),
            closed: closed.clone(),
            outbound: outbound.clone(),
        };
        *self.lock_outbound() = Some(outbound);
        tokio::spawn(context.run(commands_rx, shutdown_rx));

        *running = Some(Running {
            closed,
            shutdown: shutdown_tx,
            credential,
        });
    }

    /// Queues a command if connected. Otherwise drops it with a warning.
    pub fn send(&self, command: ClientCommand) -> bool {
        let state = self.state();
        if !state.is_connected() {
            warn!(kind = command.kind(), state = %state, "channel not connected, command dropped");
            return false;
        }
        match self.lock_outbound().as_ref() {
            Some(outbound) => outbound.send(command),
            None => false,
        }
    }

    /// Stops the connection. Idempotent.
    ///
    /// Once this returns no further frame is sent and no reconnect starts.
    pub fn close(&self) {
        let previous = self.lock_running().take();
        *self.lock_outbound() = None;

        let Some(previous) = previous else {
            return;
        };
        let (_, changed) = self.shared.advance(ConnectionState::Disconnected);
        previous.stop();
        info!(endpoint = %self.config.ws_url, "channel closed");

        if changed {
            self.shared.listeners.notify(&ConnectionState::Disconnected);
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// True between `open` and `close`, whatever the socket is doing.
    pub fn is_open(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Credential of the current connection.
    pub fn credential(&self) -> Option<Credential> {
        self.lock_running()
            .as_ref()
            .and_then(|running| running.credential.clone())
    }

    /// Registers a connection-state listener and immediately delivers the
    /// current state to it.
    ///
    /// Listeners run on the thread that changed the state and must not call
    /// `open` or `close` synchronously.
    pub fn on_connection_change<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        let current = self.state();
        listener(&current);
        self.shared.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.listeners.unsubscribe(id)
    }

    fn connect_url(&self, credential: Option<&Credential>) -> String {
        let mut url = self.base_url.clone();
        if let Some(credential) = credential {
            url.query_pairs_mut().append_pair("token", credential.expose());
        }
        url.to_string()
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_outbound(&self) -> MutexGuard<'_, Option<Outbound>> {
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        if let Some(running) = self.lock_running().take() {
            running.stop();
        }
    }
}

/// Validates a session endpoint.
pub fn parse_ws_url(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ValidationError::invalid_format("ws_url", e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ValidationError::invalid_format(
            "ws_url",
            format!("scheme must be ws or wss, got {}", other),
        )),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Loop
// ════════════════════════════════════════════════════════════════════════════

enum PumpEnd {
    Shutdown,
    Lost,
}

struct LoopContext {
    generation: u64,
    url: String,
    /// Endpoint without the credential, for logs.
    endpoint: String,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn InboundHandler>,
    shared: Arc<Shared>,
    config: ChannelConfig,
    closed: Arc<AtomicBool>,
    outbound: Outbound,
}

impl LoopContext {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ConnectionState) {
        if !self.is_closed() {
            self.shared.set_state(self.generation, state);
        }
    }

    async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<ClientCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut attempt: u32 = 0;

        loop {
            if self.is_closed() {
                break;
            }
            attempt += 1;
            let connection_id = ConnectionId::new();
            self.set_state(ConnectionState::Connecting);
            info!(%connection_id, attempt, endpoint = %self.endpoint, "connecting");

            let connected = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = self.connector.connect(&self.url) => result,
            };

            match connected {
                Ok(mut transport) => {
                    if self.is_closed() {
                        self.close_transport(transport.as_mut()).await;
                        break;
                    }
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    info!(%connection_id, endpoint = %self.endpoint, "connected");

                    let end = self
                        .pump(transport.as_mut(), &mut commands, &mut shutdown)
                        .await;
                    self.close_transport(transport.as_mut()).await;
                    if let PumpEnd::Shutdown = end {
                        break;
                    }

                    let dropped = drain(&mut commands);
                    if dropped > 0 {
                        debug!(%connection_id, dropped, "discarded queued commands");
                    }
                    if self.is_closed() {
                        break;
                    }
                    info!(%connection_id, "connection lost");
                    self.set_state(ConnectionState::Disconnected);
                    self.handler.on_disconnect();
                }
                Err(err) => {
                    error!(%connection_id, attempt, error = %err, "connect failed");
                    self.set_state(ConnectionState::Error(err.to_string()));
                    self.handler.on_transport_error(&err);
                }
            }

            if self.is_closed() {
                break;
            }
            debug!(delay_ms = self.config.reconnect_delay.as_millis() as u64, "reconnect scheduled");
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = sleep(self.config.reconnect_delay) => {}
            }
        }

        debug!(generation = self.generation, "transport loop stopped");
    }

    async fn pump(
        &self,
        transport: &mut dyn Transport,
        commands: &mut mpsc::UnboundedReceiver<ClientCommand>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PumpEnd {
        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut outcome_poll: Option<Pin<Box<Sleep>>> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => return PumpEnd::Shutdown,
                Some(command) = commands.recv() => {
                    if !self.transmit(transport, &command).await {
                        return PumpEnd::Lost;
                    }
                }
                _ = heartbeat.tick() => {
                    if !self.transmit(transport, &ClientCommand::TriggerGameSessionManager).await {
                        return PumpEnd::Lost;
                    }
                }
                _ = wait_optional(&mut outcome_poll) => {
                    outcome_poll = None;
                    debug!("post-outcome poll");
                    if !self.transmit(transport, &ClientCommand::TriggerGameSessionManager).await {
                        return PumpEnd::Lost;
                    }
                }
                frame = transport.recv() => match frame {
                    Some(Ok(text)) => {
                        if self.is_closed() {
                            return PumpEnd::Shutdown;
                        }
                        if self.handler.handle_frame(&text, &self.outbound)
                            == FrameFollowUp::PollAfterOutcome
                        {
                            outcome_poll =
                                Some(Box::pin(sleep(self.config.post_outcome_poll_delay)));
                        }
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "receive failed");
                        self.handler.on_transport_error(&err);
                        return PumpEnd::Lost;
                    }
                    None => {
                        info!("server closed the connection");
                        return PumpEnd::Lost;
                    }
                },
            }
        }
    }

    /// Sends one command. Returns false if the connection broke.
    async fn transmit(&self, transport: &mut dyn Transport, command: &ClientCommand) -> bool {
        if self.is_closed() {
            debug!(kind = command.kind(), "channel closed, command discarded");
            return true;
        }
        let text = match encode(command) {
            Ok(text) => text,
            Err(err) => {
                error!(kind = command.kind(), error = %err, "command not encodable");
                return true;
            }
        };
        match transport.send(text).await {
            Ok(()) => {
                debug!(kind = command.kind(), "sent");
                true
            }
            Err(err) => {
                error!(kind = command.kind(), error = %err, "send failed");
                self.handler.on_transport_error(&err);
                false
            }
        }
    }

    async fn close_transport(&self, transport: &mut dyn Transport) {
        match timeout(self.config.close_timeout, transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(error = %err, "close failed"),
            Err(_) => debug!("close timed out"),
        }
    }
}

async fn wait_optional(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

fn drain(commands: &mut mpsc::UnboundedReceiver<ClientCommand>) -> usize {
    let mut dropped = 0;
    while commands.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}
