//! Session protocol message types.
//!
//! Defines the JSON protocol between the client and the session server:
//! - Client → Server: picks, manager triggers, rollover and stats requests
//! - Server → Client: round state, round results, command results, errors
//!
//! Every frame is a JSON object tagged by its `type` field.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::RoundId;
use crate::domain::round::{ManagerStatus, RolloverAck, RoundClosed, SessionSnapshot};

// ============================================
// Client → Server Messages
// ============================================

/// All commands the client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Submit the player's pick for the current round.
    SelectNumber { number: u32, request_details: bool },

    /// Ask the server to publish the current round status.
    TriggerGameSessionManager,

    /// Ask the server to close a round and create the next one.
    TriggerEndSession { session_id: RoundId },

    /// Ask the server to settle player stats for a closed round.
    TriggerUpdateUserStats {
        session_id: RoundId,
        winning_number: u32,
    },
}

impl ClientCommand {
    /// Pick command as the client always sends it, asking for details.
    pub fn select_number(number: u32) -> Self {
        ClientCommand::SelectNumber {
            number,
            request_details: true,
        }
    }

    /// Wire tag of this command.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::SelectNumber { .. } => "select_number",
            ClientCommand::TriggerGameSessionManager => "trigger_game_session_manager",
            ClientCommand::TriggerEndSession { .. } => "trigger_end_session",
            ClientCommand::TriggerUpdateUserStats { .. } => "trigger_update_user_stats",
        }
    }
}

// ============================================
// Server → Client Messages
// ============================================

/// All messages the server can send, plus a pass-through for unknown tags.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Periodic round state broadcast.
    SessionUpdate(SessionSnapshot),

    /// Round state sent on connect or on request.
    SessionInfo(SessionSnapshot),

    /// The server closed the round and declared the result.
    SessionEnded(RoundClosed),

    /// Result of a `select_number` command.
    SelectNumberResult {
        accepted: bool,
        details: serde_json::Value,
    },

    /// Partial round mirror, the answer to the heartbeat.
    GameSessionManagerResult(ManagerStatus),

    /// Acknowledgment of a rollover.
    EndSessionAndCreateNewResult(RolloverAck),

    /// Result of a stats settlement request.
    UpdateUserStatsResult(serde_json::Value),

    /// Server-side failure report.
    Error { message: String },

    /// A tag this client does not know. Forwarded untouched.
    Unrecognized {
        kind: String,
        payload: serde_json::Value,
    },
}

impl InboundMessage {
    /// Wire tag of this message.
    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::SessionUpdate(_) => "session_update",
            InboundMessage::SessionInfo(_) => "session_info",
            InboundMessage::SessionEnded(_) => "session_ended",
            InboundMessage::SelectNumberResult { .. } => "select_number_result",
            InboundMessage::GameSessionManagerResult(_) => "game_session_manager_result",
            InboundMessage::EndSessionAndCreateNewResult(_) => {
                "end_session_and_create_new_result"
            }
            InboundMessage::UpdateUserStatsResult(_) => "update_user_stats_result",
            InboundMessage::Error { .. } => "error",
            InboundMessage::Unrecognized { kind, .. } => kind.as_str(),
        }
    }
}
