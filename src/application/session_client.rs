//! Session client: the public face of a round connection.
//!
//! Combines the transport channel, the round projection and the listener
//! hubs. Callers own the client (usually behind an `Arc`) and talk to it
//! through a handful of commands and `on_*` subscriptions.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::channel::{ChannelConfig, FrameFollowUp, InboundHandler, Outbound, TransportChannel};
use super::read_models::StatsRefresh;
use super::subscribers::{SessionHub, SubscriptionId};
use crate::adapters::websocket::{decode, ClientCommand, InboundMessage};
use crate::domain::foundation::{
    ClientError, ConnectionState, Credential, RoundId, UserId, ValidationError,
};
use crate::domain::round::{
    OutcomeEvent, PickState, ProjectionChange, RoundStatus, SessionProjection, SessionSnapshot,
};
use crate::ports::{Connector, CredentialProvider, TransportError};

/// Lowest and highest number the game offers.
pub const PICK_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// Settings for a [`SessionClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub channel: ChannelConfig,
    /// Send `trigger_end_session` when the live round's countdown hits zero.
    pub auto_rollover: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            auto_rollover: true,
        }
    }
}

/// Result of [`SessionClient::submit_pick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickSubmission {
    /// The pick was queued for sending and recorded for this round.
    Queued,
    /// A pick is already recorded for this round. Nothing was sent.
    AlreadySubmitted,
    /// The channel is not connected. Nothing was sent or recorded.
    NotConnected,
}

/// Projection plus hubs, shared with the transport loop.
struct SessionCore {
    projection: Mutex<SessionProjection>,
    hub: SessionHub,
    auto_rollover: bool,
}

impl SessionCore {
    fn lock(&self) -> MutexGuard<'_, SessionProjection> {
        self.projection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, changes: Vec<ProjectionChange>) {
        for change in &changes {
            self.hub.publish(change);
        }
    }
}

impl InboundHandler for SessionCore {
    fn handle_frame(&self, text: &str, outbound: &Outbound) -> FrameFollowUp {
        let message = match decode(text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "malformed frame dropped");
                self.hub.errors.notify(&ClientError::malformed(err.to_string()));
                return FrameFollowUp::Nothing;
            }
        };
        debug!(kind = message.kind(), "frame received");

        let mut follow_up = FrameFollowUp::Nothing;
        let mut server_error = None;

        // Fold under the lock, notify after releasing it
        let (changes, rollover) = {
            let mut projection = self.lock();
            let changes = match message.clone() {
                InboundMessage::SessionUpdate(snapshot) | InboundMessage::SessionInfo(snapshot) => {
                    projection.apply_state(snapshot)
                }
                InboundMessage::SessionEnded(closed) => {
                    follow_up = FrameFollowUp::PollAfterOutcome;
                    projection.apply_round_closed(closed)
                }
                InboundMessage::SelectNumberResult { accepted, .. } => {
                    projection.resolve_pick(accepted)
                }
                InboundMessage::GameSessionManagerResult(status) => {
                    projection.apply_manager_status(status)
                }
                InboundMessage::EndSessionAndCreateNewResult(ack) => projection.apply_rollover(ack),
                InboundMessage::UpdateUserStatsResult(details) => {
                    debug!(%details, "user stats settled");
                    Vec::new()
                }
                InboundMessage::Error { message } => {
                    warn!(%message, "server reported an error");
                    server_error = Some(ClientError::protocol(message));
                    Vec::new()
                }
                InboundMessage::Unrecognized { kind, .. } => {
                    debug!(%kind, "unrecognized message forwarded to listeners only");
                    Vec::new()
                }
            };
            let rollover = if self.auto_rollover {
                projection.take_rollover_due()
            } else {
                None
            };
            (changes, rollover)
        };

        self.publish(changes);
        if let Some(error) = server_error {
            self.hub.errors.notify(&error);
        }
        self.hub.messages.notify(&message);
        if let Some(round_id) = rollover {
            info!(round_id = %round_id, "countdown expired, requesting rollover");
            outbound.send(ClientCommand::TriggerEndSession { session_id: round_id });
        }

        follow_up
    }

    fn on_transport_error(&self, error: &TransportError) {
        self.hub.errors.notify(&ClientError::transport(error.to_string()));
    }

    fn on_disconnect(&self) {
        let changes = self.lock().reset();
        self.publish(changes);
    }
}

/// Real-time view of the current round, plus the commands a player can issue.
pub struct SessionClient {
    core: Arc<SessionCore>,
    channel: TransportChannel,
    stats_refresh: Option<Arc<dyn StatsRefresh>>,
}

impl SessionClient {
    /// Creates a client that is not yet connected.
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> Result<Self, ValidationError> {
        let core = Arc::new(SessionCore {
            projection: Mutex::new(SessionProjection::new()),
            hub: SessionHub::new(),
            auto_rollover: config.auto_rollover,
        });
        let channel = TransportChannel::new(config.channel, connector, core.clone())?;
        Ok(Self {
            core,
            channel,
            stats_refresh: None,
        })
    }

    /// Attaches the stats read model driven by `report_stats_refresh`.
    pub fn with_stats_refresh(mut self, refresh: Arc<dyn StatsRefresh>) -> Self {
        self.stats_refresh = Some(refresh);
        self
    }

    // ───────────────────────────────────────────────────────────────
    // Commands
    // ───────────────────────────────────────────────────────────────

    /// Connects to the round server, anonymously when `credential` is `None`.
    ///
    /// Joining again with the same credential keeps the current connection.
    /// A different credential tears it down and starts from a clean view.
    pub fn join(&self, credential: Option<Credential>) {
        if self.channel.is_open() {
            let same = match (self.channel.credential(), credential.as_ref()) {
                (None, None) => true,
                (Some(current), Some(next)) => current.same_as(next),
                _ => false,
            };
            if same {
                debug!("already joined with this credential");
                return;
            }
            info!("credential changed, reconnecting");
            self.channel.close();
            let changes = self.core.lock().clear();
            self.core.publish(changes);
        }
        self.channel.open(credential);
    }

    /// Joins with whatever credential the provider currently holds.
    pub fn join_with_provider(&self, provider: &dyn CredentialProvider) {
        self.join(provider.current());
    }

    /// Disconnects and forgets the round.
    pub fn leave(&self) {
        self.channel.close();
        let changes = self.core.lock().clear();
        self.core.publish(changes);
    }

    /// Submits the player's pick for the current round.
    ///
    /// Numbers outside 1 to 10 are logged and sent anyway; the server
    /// decides.
    pub fn submit_pick(&self, number: u32) -> PickSubmission {
        if !PICK_RANGE.contains(&number) {
            warn!(number, "pick outside 1..=10, sending anyway");
        }

        let mut projection = self.core.lock();
        if let Some(existing) = projection.pick().number() {
            debug!(number, existing, "pick already submitted this round");
            return PickSubmission::AlreadySubmitted;
        }
        if !projection.status().accepts_picks() {
            debug!(number, status = %projection.status(), "no active round known, sending anyway");
        }
        if !self.channel.send(ClientCommand::select_number(number)) {
            return PickSubmission::NotConnected;
        }
        projection.record_pick(number);
        info!(number, round_id = ?projection.current_round_id(), "pick submitted");
        PickSubmission::Queued
    }

    /// Asks the server to close `round_id` and open the next round.
    pub fn request_rollover(&self, round_id: &RoundId) -> bool {
        self.channel.send(ClientCommand::TriggerEndSession {
            session_id: round_id.clone(),
        })
    }

    /// Asks the server to settle player stats for a closed round.
    pub fn update_user_stats(&self, round_id: &RoundId, winning_number: u32) -> bool {
        self.channel.send(ClientCommand::TriggerUpdateUserStats {
            session_id: round_id.clone(),
            winning_number,
        })
    }

    /// Asks the stats read model to re-query the player's stats.
    pub fn report_stats_refresh(&self, user_id: UserId) {
        match &self.stats_refresh {
            Some(refresh) => refresh.refresh(user_id),
            None => debug!(%user_id, "no stats read model attached"),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Queries
    // ───────────────────────────────────────────────────────────────

    /// The live snapshot. `None` before the first round message and while
    /// disconnected.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.core.lock().snapshot().cloned()
    }

    /// The live snapshot, or the one held before the last disconnect.
    pub fn last_known_snapshot(&self) -> Option<SessionSnapshot> {
        self.core.lock().last_known().cloned()
    }

    pub fn status(&self) -> RoundStatus {
        self.core.lock().status()
    }

    pub fn pick(&self) -> PickState {
        self.core.lock().pick()
    }

    pub fn current_round_id(&self) -> Option<RoundId> {
        self.core.lock().current_round_id().cloned()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    // ───────────────────────────────────────────────────────────────
    // Subscriptions
    // ───────────────────────────────────────────────────────────────

    /// Called with every new snapshot, and with `None` when the live view
    /// is dropped.
    pub fn on_change<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Option<SessionSnapshot>) + Send + Sync + 'static,
    {
        self.core.hub.snapshots.subscribe(listener)
    }

    /// Called once per round when the server declares the result.
    pub fn on_outcome<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&OutcomeEvent) + Send + Sync + 'static,
    {
        self.core.hub.outcomes.subscribe(listener)
    }

    pub fn on_error<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.core.hub.errors.subscribe(listener)
    }

    /// Called with the current state right away, then on every change.
    pub fn on_connection_change<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.channel.on_connection_change(listener)
    }

    /// Called with every decoded inbound message, recognized or not.
    ///
    /// Runs after the message has been folded in, so `snapshot()` inside the
    /// listener already reflects it.
    pub fn on_message<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.core.hub.messages.subscribe(listener)
    }

    /// Removes one listener registered through any `on_*` method.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.core.hub.unsubscribe(id) || self.channel.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::credentials::InMemoryCredentialStore;
    use crate::adapters::websocket::{InMemoryConnector, InMemoryPeer};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::time::sleep;

    fn client() -> (SessionClient, InMemoryConnector) {
        client_with(true)
    }

    fn client_with(auto_rollover: bool) -> (SessionClient, InMemoryConnector) {
        let connector = InMemoryConnector::new();
        let config = ClientConfig {
            channel: ChannelConfig::new("ws://test/ws/game/")
                .with_heartbeat_interval(Duration::from_secs(3600)),
            auto_rollover,
        };
        let client = SessionClient::new(config, Arc::new(connector.clone())).unwrap();
        (client, connector)
    }

    async fn settle() {
        sleep(Duration::from_millis(10)).await;
    }

    async fn joined() -> (SessionClient, InMemoryConnector, InMemoryPeer) {
        let (client, connector) = client();
        let peer = connector.accept_next();
        client.join(None);
        settle().await;
        (client, connector, peer)
    }

    fn session_info(round: &str, time_remaining: u32, is_active: bool) -> Value {
        json!({
            "type": "session_info",
            "session": {
                "id": 1,
                "session_id": round,
                "is_active": is_active,
                "time_remaining": time_remaining,
                "player_count": 0,
                "participations": []
            }
        })
    }

    fn sent_types(peer: &mut InMemoryPeer) -> Vec<String> {
        peer.sent_json()
            .iter()
            .map(|frame| frame["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_invalid_endpoint() {
        let config = ClientConfig {
            channel: ChannelConfig::new("http://nope/"),
            auto_rollover: true,
        };
        let result = SessionClient::new(config, Arc::new(InMemoryConnector::new()));
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn round_state_populates_snapshot_and_status() {
        let (client, _connector, peer) = joined().await;

        peer.push_json(&session_info("r1", 15, true));
        settle().await;

        let snapshot = client.snapshot().unwrap();
        assert_eq!(snapshot.round_id.as_str(), "r1");
        assert_eq!(snapshot.time_remaining, 15);
        assert_eq!(client.status(), RoundStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn join_with_same_credential_keeps_connection() {
        let (client, connector) = client();
        let _peer = connector.accept_next();

        client.join(Some(Credential::new("tok")));
        settle().await;
        client.join(Some(Credential::new("tok")));
        settle().await;

        assert_eq!(connector.attempts(), 1);
        assert!(client.connection_state().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn join_with_new_credential_reconnects_from_clean_view() {
        let (client, connector) = client();
        let first = connector.accept_next();
        let _second = connector.accept_next();

        client.join(Some(Credential::new("old")));
        settle().await;
        first.push_json(&session_info("r1", 10, true));
        settle().await;
        assert!(client.snapshot().is_some());

        client.join(Some(Credential::new("new")));
        assert!(client.last_known_snapshot().is_none());
        settle().await;

        assert!(first.is_closed());
        assert_eq!(connector.attempts(), 2);
        assert!(connector.urls()[1].ends_with("token=new"));
    }

    #[tokio::test(start_paused = true)]
    async fn join_with_provider_uses_current_credential() {
        let (client, connector) = client();
        let _peer = connector.accept_next();
        let store = InMemoryCredentialStore::with_token("from-store");

        client.join_with_provider(&store);
        settle().await;

        assert_eq!(connector.urls(), vec!["ws://test/ws/game/?token=from-store"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pick_while_disconnected_is_not_recorded() {
        let (client, _connector) = client();

        assert_eq!(client.submit_pick(4), PickSubmission::NotConnected);
        assert_eq!(client.pick(), PickState::NotPicked);
    }

    #[tokio::test(start_paused = true)]
    async fn second_pick_in_same_round_is_a_noop() {
        let (client, _connector, mut peer) = joined().await;
        peer.push_json(&session_info("r1", 15, true));
        settle().await;

        assert_eq!(client.submit_pick(7), PickSubmission::Queued);
        assert_eq!(client.submit_pick(3), PickSubmission::AlreadySubmitted);
        settle().await;

        let sent = peer.sent_json();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["number"], 7);
        assert_eq!(client.pick(), PickState::Pending(7));
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_pick_is_still_sent() {
        let (client, _connector, mut peer) = joined().await;

        assert_eq!(client.submit_pick(42), PickSubmission::Queued);
        settle().await;

        assert_eq!(peer.sent_json()[0]["number"], 42);
    }

    #[tokio::test(start_paused = true)]
    async fn pick_result_confirms_or_forgets_the_pick() {
        let (client, _connector, peer) = joined().await;
        peer.push_json(&session_info("r1", 15, true));
        settle().await;

        client.submit_pick(5);
        peer.push_json(&json!({"type": "select_number_result", "success": false}));
        settle().await;
        assert_eq!(client.pick(), PickState::NotPicked);

        client.submit_pick(6);
        peer.push_json(&json!({"type": "select_number_result", "success": true}));
        settle().await;
        assert_eq!(client.pick(), PickState::Confirmed(6));
    }

    #[tokio::test(start_paused = true)]
    async fn new_round_allows_a_new_pick() {
        let (client, _connector, peer) = joined().await;
        peer.push_json(&session_info("r1", 15, true));
        settle().await;
        client.submit_pick(2);

        peer.push_json(&session_info("r2", 20, true));
        settle().await;

        assert_eq!(client.pick(), PickState::NotPicked);
        assert_eq!(client.submit_pick(3), PickSubmission::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_is_published_and_connection_stays_open() {
        let (client, _connector, peer) = joined().await;
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = errors.clone();
        client.on_error(move |err| e.lock().unwrap().push(err.clone()));

        peer.push_json(&json!({"type": "error", "message": "round not found"}));
        settle().await;

        assert_eq!(
            *errors.lock().unwrap(),
            vec![ClientError::protocol("round not found")]
        );
        assert!(client.connection_state().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_keeps_snapshot_and_connection() {
        let (client, _connector, peer) = joined().await;
        peer.push_json(&session_info("r1", 12, true));
        settle().await;
        let before = client.snapshot();

        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = errors.clone();
        client.on_error(move |err| e.lock().unwrap().push(err.clone()));

        peer.push("{not json");
        peer.push_json(&json!({"type": "session_update"}));
        settle().await;

        assert_eq!(client.snapshot(), before);
        assert!(client.connection_state().is_connected());
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ClientError::MalformedMessage { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_message_reaches_message_listeners_only() {
        let (client, _connector, peer) = joined().await;
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let k = kinds.clone();
        client.on_message(move |m| k.lock().unwrap().push(m.kind().to_string()));
        let changes = Arc::new(Mutex::new(0));
        let c = changes.clone();
        client.on_change(move |_| *c.lock().unwrap() += 1);

        peer.push_json(&json!({"type": "chat", "text": "hi"}));
        settle().await;

        assert_eq!(*kinds.lock().unwrap(), vec!["chat"]);
        assert_eq!(*changes.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn message_listeners_see_the_folded_snapshot() {
        let (client, _connector, peer) = joined().await;
        let client = Arc::new(client);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let weak = Arc::downgrade(&client);
        client.on_message(move |_| {
            if let Some(client) = weak.upgrade() {
                let remaining = client.snapshot().map(|snap| snap.time_remaining);
                s.lock().unwrap().push(remaining);
            }
        });

        peer.push_json(&session_info("r1", 12, true));
        peer.push_json(&session_info("r1", 11, true));
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec![Some(12), Some(11)]);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_countdown_requests_rollover_once() {
        let (client, _connector, mut peer) = joined().await;

        peer.push_json(&session_info("r1", 0, true));
        peer.push_json(&session_info("r1", 0, true));
        settle().await;

        let sent = peer.sent_json();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            json!({"type": "trigger_end_session", "session_id": "r1"})
        );
        assert_eq!(client.status(), RoundStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_rollover_can_be_disabled() {
        let (client, connector) = client_with(false);
        let mut peer = connector.accept_next();
        client.join(None);
        settle().await;

        peer.push_json(&session_info("r1", 0, true));
        settle().await;

        assert!(peer.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rollover_acknowledgment_starts_fresh_round() {
        let (client, _connector, peer) = joined().await;
        peer.push_json(&session_info("r1", 0, false));
        settle().await;

        peer.push_json(&json!({
            "type": "end_session_and_create_new_result",
            "result": {"new_session_id": "r2", "new_session_start_time": "2024-01-01T10:00:00Z"}
        }));
        settle().await;

        let snapshot = client.snapshot().unwrap();
        assert_eq!(snapshot.round_id.as_str(), "r2");
        assert_eq!(snapshot.time_remaining, 20);
        assert!(snapshot.is_active);
        assert!(snapshot.players.is_empty());
        assert_eq!(client.status(), RoundStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn manager_status_merges_onto_current_round() {
        let (client, _connector, peer) = joined().await;
        peer.push_json(&session_info("r1", 15, true));
        settle().await;

        peer.push_json(&json!({
            "type": "game_session_manager_result",
            "result": {"session_id": "r1", "is_active": true, "player_count": 3, "time_left": 9.7}
        }));
        settle().await;

        let snapshot = client.snapshot().unwrap();
        assert_eq!(snapshot.player_count, 3);
        assert_eq!(snapshot.time_remaining, 9);
        assert_eq!(snapshot.id, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_encoded_on_the_wire() {
        let (client, _connector, mut peer) = joined().await;
        let round = RoundId::new("r9").unwrap();

        assert!(client.request_rollover(&round));
        assert!(client.update_user_stats(&round, 4));
        settle().await;

        assert_eq!(
            sent_types(&mut peer),
            vec!["trigger_end_session", "trigger_update_user_stats"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn leave_clears_everything_and_notifies() {
        let (client, _connector, peer) = joined().await;
        peer.push_json(&session_info("r1", 15, true));
        settle().await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        client.on_change(move |snapshot| s.lock().unwrap().push(snapshot.is_some()));

        client.leave();

        assert_eq!(*seen.lock().unwrap(), vec![false]);
        assert!(client.last_known_snapshot().is_none());
        assert_eq!(client.status(), RoundStatus::NoSession);
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_covers_connection_listeners() {
        let (client, _connector) = client();
        let id = client.on_connection_change(|_| {});
        let other = client.on_outcome(|_| {});

        assert!(client.unsubscribe(id));
        assert!(client.unsubscribe(other));
        assert!(!client.unsubscribe(id));
    }

    struct CountingRefresh(Mutex<Vec<UserId>>);

    impl StatsRefresh for CountingRefresh {
        fn refresh(&self, user_id: UserId) {
            self.0.lock().unwrap().push(user_id);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stats_refresh_is_forwarded_to_read_model() {
        let (client, _connector) = client();
        let refresh = Arc::new(CountingRefresh(Mutex::new(Vec::new())));
        let client = client.with_stats_refresh(refresh.clone());

        client.report_stats_refresh(UserId::new(12));

        assert_eq!(*refresh.0.lock().unwrap(), vec![UserId::new(12)]);
    }
}
