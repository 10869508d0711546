//! Player statistics reader port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domain::foundation::{deserialize_optional_lenient, Timestamp, UserId};

/// Aggregate results for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub username: String,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub games_played: u32,
    /// Percentage, 0-100.
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_lenient"
    )]
    pub last_played: Option<Timestamp>,
}

impl UserStats {
    /// Win rate rounded to a whole percent, zero when no games were played.
    pub fn win_rate_percent(&self) -> u32 {
        if self.games_played == 0 || !self.win_rate.is_finite() {
            0
        } else {
            self.win_rate.round().clamp(0.0, 100.0) as u32
        }
    }
}

/// Reader port for player statistics.
#[async_trait]
pub trait StatsReader: Send + Sync {
    /// Fetch the statistics of one player.
    async fn fetch_stats(&self, user_id: UserId) -> Result<UserStats, ApiError>;
}
