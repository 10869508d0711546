//! Server-declared round results and partial round payloads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::snapshot::{deserialize_optional_seconds, Participation};
use crate::domain::foundation::{deserialize_optional_lenient, RoundId, Timestamp};

/// Published once per round when the server declares the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeEvent {
    /// Round the outcome belongs to, when the client had seen its state.
    pub round_id: Option<RoundId>,
    pub winning_number: u32,
    pub winners: BTreeSet<String>,
    pub participations: Vec<Participation>,
}

impl OutcomeEvent {
    /// Returns true if the given player won.
    pub fn is_winner(&self, username: &str) -> bool {
        self.winners.contains(username)
    }
}

/// Payload of `session_ended`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundClosed {
    pub winning_number: u32,
    #[serde(default)]
    pub winners: Vec<String>,
    #[serde(default)]
    pub participations: Vec<Participation>,
}

impl RoundClosed {
    /// Winner usernames as a set.
    pub fn winner_set(&self) -> BTreeSet<String> {
        self.winners.iter().cloned().collect()
    }
}

/// Partial round mirror carried by `game_session_manager_result`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStatus {
    #[serde(default)]
    pub session_id: Option<RoundId>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub player_count: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_optional_seconds")]
    pub time_left: Option<u32>,
}

/// Rollover acknowledgment carried by `end_session_and_create_new_result`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverAck {
    #[serde(default)]
    pub new_session_id: Option<RoundId>,
    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub new_session_start_time: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_closed_requires_winning_number() {
        let result = serde_json::from_value::<RoundClosed>(json!({"winners": []}));
        assert!(result.is_err());
    }

    #[test]
    fn round_closed_collects_winner_set() {
        let closed: RoundClosed = serde_json::from_value(json!({
            "winning_number": 7,
            "winners": ["alice", "carol", "alice"]
        }))
        .unwrap();

        assert_eq!(closed.winner_set().len(), 2);
        assert!(closed.participations.is_empty());
    }

    #[test]
    fn manager_status_fields_are_all_optional() {
        let status: ManagerStatus = serde_json::from_value(json!({})).unwrap();
        assert_eq!(status, ManagerStatus::default());

        let status: ManagerStatus =
            serde_json::from_value(json!({"session_id": 5, "time_left": 3.2})).unwrap();
        assert_eq!(status.session_id.unwrap().as_str(), "5");
        assert_eq!(status.time_left, Some(3));
    }

    #[test]
    fn rollover_ack_parses_start_time() {
        let ack: RolloverAck = serde_json::from_value(json!({
            "new_session_id": "r-2",
            "new_session_start_time": "2025-05-01T10:00:20"
        }))
        .unwrap();
        assert!(ack.new_session_start_time.is_some());
    }

    #[test]
    fn outcome_answers_is_winner() {
        let outcome = OutcomeEvent {
            round_id: None,
            winning_number: 7,
            winners: BTreeSet::from(["alice".to_string()]),
            participations: vec![],
        };
        assert!(outcome.is_winner("alice"));
        assert!(!outcome.is_winner("bob"));
    }
}
