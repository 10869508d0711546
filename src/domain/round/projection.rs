//! Folds server messages into the client's view of the current round.
//!
//! The projection is pure state: it performs no I/O and never consults a
//! clock. Every `apply_*` call returns the list of changes the caller must
//! republish, in order.

use tracing::{debug, warn};

use super::outcome::{ManagerStatus, OutcomeEvent, RolloverAck, RoundClosed};
use super::snapshot::{dedup_by_username, SessionSnapshot};
use super::status::RoundStatus;
use crate::domain::foundation::{RoundId, StateMachine};

/// Local record of the player's pick for the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickState {
    #[default]
    NotPicked,
    /// Sent, not yet acknowledged.
    Pending(u32),
    /// Acknowledged by `select_number_result`.
    Confirmed(u32),
}

impl PickState {
    /// The picked number, if any.
    pub fn number(&self) -> Option<u32> {
        match self {
            PickState::NotPicked => None,
            PickState::Pending(n) | PickState::Confirmed(n) => Some(*n),
        }
    }

    pub fn is_picked(&self) -> bool {
        !matches!(self, PickState::NotPicked)
    }
}

/// Something observers need to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionChange {
    /// New live snapshot; `None` means the live view was dropped.
    SnapshotChanged(Option<SessionSnapshot>),
    Outcome(OutcomeEvent),
    PickConfirmed(u32),
}

/// The client-side round state machine.
#[derive(Debug, Default)]
pub struct SessionProjection {
    status: RoundStatus,
    snapshot: Option<SessionSnapshot>,
    stale: Option<SessionSnapshot>,
    /// Round the bookkeeping below belongs to. Survives `reset`.
    round_key: Option<RoundId>,
    outcome_delivered: bool,
    pick: PickState,
    rollover_requested: bool,
    /// A round closed before its id was known.
    closed_unnamed_round: bool,
}

impl SessionProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    /// The live snapshot. `None` before the first state message and after a
    /// disconnect.
    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        self.snapshot.as_ref()
    }

    /// The live snapshot, or the one held before the last disconnect.
    pub fn last_known(&self) -> Option<&SessionSnapshot> {
        self.snapshot.as_ref().or(self.stale.as_ref())
    }

    pub fn pick(&self) -> PickState {
        self.pick
    }

    pub fn current_round_id(&self) -> Option<&RoundId> {
        self.round_key.as_ref()
    }

    /// Handles `session_update` and `session_info`.
    pub fn apply_state(&mut self, snapshot: SessionSnapshot) -> Vec<ProjectionChange> {
        self.install(snapshot.normalized())
    }

    /// Handles `game_session_manager_result`.
    ///
    /// Present fields are merged onto the known snapshot of the same round.
    /// A status for a different round starts from an empty snapshot.
    pub fn apply_manager_status(&mut self, status: ManagerStatus) -> Vec<ProjectionChange> {
        let Some(round_id) = status.session_id else {
            debug!("manager status without session_id ignored");
            return Vec::new();
        };

        let mut merged = match self.last_known() {
            Some(known) if known.round_id == round_id => known.clone(),
            _ => SessionSnapshot::empty(round_id),
        };
        if let Some(is_active) = status.is_active {
            merged.is_active = is_active;
        }
        if let Some(player_count) = status.player_count {
            merged.player_count = player_count;
        }
        if let Some(time_left) = status.time_left {
            merged.time_remaining = time_left;
        }

        self.install(merged)
    }

    /// Handles `end_session_and_create_new_result`.
    pub fn apply_rollover(&mut self, ack: RolloverAck) -> Vec<ProjectionChange> {
        let Some(round_id) = ack.new_session_id else {
            debug!("rollover acknowledgment without new_session_id ignored");
            return Vec::new();
        };

        if self.status == RoundStatus::Active && self.round_key.as_ref() == Some(&round_id) {
            debug!(round_id = %round_id, "duplicate rollover acknowledgment ignored");
            return Vec::new();
        }

        self.install(SessionSnapshot::fresh(round_id, ack.new_session_start_time))
    }

    /// Handles `session_ended`.
    ///
    /// Fires the outcome at most once per round.
    pub fn apply_round_closed(&mut self, closed: RoundClosed) -> Vec<ProjectionChange> {
        if self.outcome_delivered {
            debug!(
                round_id = ?self.round_key,
                "outcome already delivered for this round"
            );
            return Vec::new();
        }

        let winners = closed.winner_set();
        let mut changes = Vec::with_capacity(2);

        let participations = match self.snapshot.take() {
            Some(mut snapshot) => {
                if !closed.participations.is_empty() {
                    snapshot.participations = closed.participations.clone();
                    snapshot = snapshot.normalized();
                }
                snapshot.mark_winners(&winners);
                snapshot.winning_number = Some(closed.winning_number);
                snapshot.is_active = false;
                snapshot.time_remaining = 0;

                let participations = snapshot.participations.clone();
                self.snapshot = Some(snapshot.clone());
                changes.push(ProjectionChange::SnapshotChanged(Some(snapshot)));
                participations
            }
            None => {
                let mut participations = dedup_by_username(closed.participations);
                for participation in &mut participations {
                    participation.is_winner = winners.contains(&participation.username);
                }
                participations
            }
        };

        self.move_to(RoundStatus::Closed);
        self.outcome_delivered = true;
        self.closed_unnamed_round = self.round_key.is_none();

        changes.push(ProjectionChange::Outcome(OutcomeEvent {
            round_id: self.round_key.clone(),
            winning_number: closed.winning_number,
            winners,
            participations,
        }));
        changes
    }

    /// Records a pick for the current round. Returns false if one exists.
    pub fn record_pick(&mut self, number: u32) -> bool {
        if self.pick.is_picked() {
            return false;
        }
        self.pick = PickState::Pending(number);
        true
    }

    /// Handles `select_number_result`.
    ///
    /// A rejected pick is forgotten so the player may try again.
    pub fn resolve_pick(&mut self, accepted: bool) -> Vec<ProjectionChange> {
        match (self.pick, accepted) {
            (PickState::Pending(n), true) => {
                self.pick = PickState::Confirmed(n);
                vec![ProjectionChange::PickConfirmed(n)]
            }
            (PickState::Pending(n), false) => {
                warn!(number = n, "server rejected pick");
                self.pick = PickState::NotPicked;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Returns the round id once when the live round's countdown hit zero
    /// while the server still reports it active.
    pub fn take_rollover_due(&mut self) -> Option<RoundId> {
        if self.rollover_requested || self.status != RoundStatus::Active {
            return None;
        }
        let snapshot = self.snapshot.as_ref()?;
        if snapshot.is_active && snapshot.time_remaining == 0 {
            self.rollover_requested = true;
            Some(snapshot.round_id.clone())
        } else {
            None
        }
    }

    /// Drops the live view after a disconnect.
    ///
    /// The previous snapshot stays reachable through `last_known`. Pick and
    /// outcome bookkeeping are kept until a different round shows up.
    pub fn reset(&mut self) -> Vec<ProjectionChange> {
        self.move_to(RoundStatus::NoSession);
        match self.snapshot.take() {
            Some(snapshot) => {
                self.stale = Some(snapshot);
                vec![ProjectionChange::SnapshotChanged(None)]
            }
            None => Vec::new(),
        }
    }

    /// Forgets everything, including the stale snapshot.
    pub fn clear(&mut self) -> Vec<ProjectionChange> {
        let had_snapshot = self.snapshot.is_some();
        *self = Self::default();
        if had_snapshot {
            vec![ProjectionChange::SnapshotChanged(None)]
        } else {
            Vec::new()
        }
    }

    fn install(&mut self, snapshot: SessionSnapshot) -> Vec<ProjectionChange> {
        self.begin_round(&snapshot.round_id, snapshot.is_settled());

        let target = if self.outcome_delivered || snapshot.is_settled() {
            RoundStatus::Closed
        } else {
            RoundStatus::Active
        };
        self.move_to(target);

        self.stale = None;
        self.snapshot = Some(snapshot.clone());
        vec![ProjectionChange::SnapshotChanged(Some(snapshot))]
    }

    /// `settled` tells whether the incoming snapshot already carries a result.
    fn begin_round(&mut self, round_id: &RoundId, settled: bool) {
        match &self.round_key {
            Some(current) if current == round_id => {}
            Some(previous) => {
                debug!(from = %previous, to = %round_id, "new round");
                self.round_key = Some(round_id.clone());
                self.forget_round();
            }
            // An unsettled round after an unnamed close is the next round.
            None if self.closed_unnamed_round && !settled => {
                debug!(round_id = %round_id, "first round after an unnamed close");
                self.round_key = Some(round_id.clone());
                self.forget_round();
            }
            // First round seen: keep anything recorded before its id was known.
            None => {
                debug!(round_id = %round_id, "first round");
                self.round_key = Some(round_id.clone());
                self.closed_unnamed_round = false;
            }
        }
    }

    fn forget_round(&mut self) {
        self.outcome_delivered = false;
        self.pick = PickState::NotPicked;
        self.rollover_requested = false;
        self.closed_unnamed_round = false;
    }

    fn move_to(&mut self, target: RoundStatus) {
        if self.status == target {
            return;
        }
        match self.status.transition_to(target) {
            Ok(next) => self.status = next,
            Err(err) => warn!(error = %err, "round status transition refused"),
        }
    }
}
