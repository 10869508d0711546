//! Game history reader port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domain::foundation::{deserialize_optional_lenient, Timestamp};
use crate::domain::round::SessionSnapshot;

/// One past participation of the current player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub username: String,
    #[serde(default)]
    pub selected_number: Option<u32>,
    #[serde(default)]
    pub is_winner: bool,
    #[serde(default, deserialize_with = "deserialize_optional_lenient")]
    pub joined_at: Option<Timestamp>,
    pub session: SessionSnapshot,
}

/// Which page of the history to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// 1-based page number.
    pub page: u32,
}

impl HistoryPage {
    pub fn first() -> Self {
        Self { page: 1 }
    }

    pub fn next(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
        }
    }
}

impl Default for HistoryPage {
    fn default() -> Self {
        Self::first()
    }
}

/// Reader port for the player's game history.
#[async_trait]
pub trait HistoryReader: Send + Sync {
    /// Fetch one page of past participations, most recent first.
    async fn fetch_history(&self, page: HistoryPage) -> Result<Vec<HistoryEntry>, ApiError>;
}
