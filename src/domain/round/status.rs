//! RoundStatus enum for tracking the lifecycle of the mirrored round.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Local view of where the server's round is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Not connected, or connected but no round state received yet.
    #[default]
    NoSession,
    Active,
    /// The server declared the outcome of the current round.
    Closed,
}

impl RoundStatus {
    /// Returns true if picks can still be accepted by the server.
    pub fn accepts_picks(&self) -> bool {
        matches!(self, RoundStatus::Active)
    }
}

impl StateMachine for RoundStatus {
    /// Valid transitions:
    /// - NoSession -> Active, Closed
    /// - Active -> Active, Closed, NoSession
    /// - Closed -> Active, NoSession
    fn can_transition_to(&self, target: &Self) -> bool {
        use RoundStatus::*;
        matches!(
            (self, target),
            (NoSession, Active)
                | (NoSession, Closed)
                | (Active, Active)
                | (Active, Closed)
                | (Active, NoSession)
                | (Closed, Active)
                | (Closed, NoSession)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RoundStatus::*;
        match self {
            NoSession => vec![Active, Closed],
            Active => vec![Active, Closed, NoSession],
            Closed => vec![Active, NoSession],
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundStatus::NoSession => "NoSession",
            RoundStatus::Active => "Active",
            RoundStatus::Closed => "Closed",
        };
        write!(f, "{}", s)
    }
}
