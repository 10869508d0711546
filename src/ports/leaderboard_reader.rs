//! Leaderboard reader port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;

/// One row of the top-10 table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: String,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub games_played: u32,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub best_streak: u32,
}

/// Reader port for the leaderboard.
#[async_trait]
pub trait LeaderboardReader: Send + Sync {
    /// Fetch the top entries ordered by rank.
    async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ApiError>;
}
