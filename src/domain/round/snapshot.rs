//! Local mirror of the server's round state.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::domain::foundation::{deserialize_optional_lenient, RoundId, Timestamp};

/// Countdown length of a freshly created round, in seconds.
pub const DEFAULT_ROUND_SECONDS: u32 = 20;

/// One player's entry in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    pub username: String,
    #[serde(default)]
    pub selected_number: Option<u32>,
    #[serde(default)]
    pub is_winner: bool,
}

/// The client's copy of one round, as last reported by the server.
///
/// Replaced wholesale on every round-state message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Server row id. Zero when unknown.
    #[serde(default)]
    pub id: u64,
    #[serde(rename = "session_id")]
    pub round_id: RoundId,
    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub start_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub end_time: Option<Timestamp>,
    #[serde(default)]
    pub winning_number: Option<u32>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub player_count: u32,
    #[serde(default, deserialize_with = "deserialize_seconds")]
    pub time_remaining: u32,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub participations: Vec<Participation>,
}

impl SessionSnapshot {
    /// Placeholder for a round the client knows only by id.
    pub fn empty(round_id: RoundId) -> Self {
        Self {
            id: 0,
            round_id,
            start_time: None,
            end_time: None,
            winning_number: None,
            is_active: false,
            player_count: 0,
            time_remaining: 0,
            players: Vec::new(),
            participations: Vec::new(),
        }
    }

    /// A newly created round with a full countdown and no players.
    pub fn fresh(round_id: RoundId, start_time: Option<Timestamp>) -> Self {
        Self {
            start_time,
            is_active: true,
            time_remaining: DEFAULT_ROUND_SECONDS,
            ..Self::empty(round_id)
        }
    }

    /// Collapses duplicate participations so each username appears once.
    ///
    /// A later entry replaces an earlier one but keeps its position.
    pub fn normalized(mut self) -> Self {
        self.participations = dedup_by_username(std::mem::take(&mut self.participations));
        self
    }

    /// Marks exactly the given usernames as winners and everyone else as not.
    pub fn mark_winners(&mut self, winners: &BTreeSet<String>) {
        for participation in &mut self.participations {
            participation.is_winner = winners.contains(&participation.username);
        }
    }

    /// Usernames currently flagged as winners.
    pub fn winners(&self) -> BTreeSet<String> {
        self.participations
            .iter()
            .filter(|p| p.is_winner)
            .map(|p| p.username.clone())
            .collect()
    }

    /// Looks up a player's participation.
    pub fn participation_for(&self, username: &str) -> Option<&Participation> {
        self.participations.iter().find(|p| p.username == username)
    }

    /// True when the server has closed the round and published a number.
    pub fn is_settled(&self) -> bool {
        !self.is_active && self.winning_number.is_some()
    }
}

/// Keeps one participation per username; later entries win.
pub(crate) fn dedup_by_username(participations: Vec<Participation>) -> Vec<Participation> {
    let mut unique: Vec<Participation> = Vec::with_capacity(participations.len());
    for entry in participations {
        match unique.iter_mut().find(|p| p.username == entry.username) {
            Some(existing) => *existing = entry,
            None => unique.push(entry),
        }
    }
    unique
}

/// Accepts any JSON number (or null) for a seconds field, clamped at zero.
pub(crate) fn deserialize_seconds<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.map(clamp_seconds).unwrap_or(0))
}

/// Optional variant of [`deserialize_seconds`] for partial payloads.
pub(crate) fn deserialize_optional_seconds<'de, D>(
    deserializer: D,
) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.map(clamp_seconds))
}

fn clamp_seconds(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        value.floor() as u32
    }
}
