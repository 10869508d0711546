//! Read models for the HTTP-backed views: player stats, game history and
//! the leaderboard.
//!
//! Each view is a [`ReadModel`] holding a [`QueryState`]. Loading publishes
//! twice: once when the request starts and once when it settles. A load
//! that was overtaken by a newer one is discarded.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::subscribers::{Listeners, SubscriptionId};
use crate::domain::foundation::UserId;
use crate::ports::{
    ApiError, HistoryEntry, HistoryPage, HistoryReader, LeaderboardEntry, LeaderboardReader,
    StatsReader, UserStats,
};

/// Loading state of one remote view.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

struct Slot<T> {
    state: QueryState<T>,
    latest_request: u64,
}

/// Observable [`QueryState`].
pub struct ReadModel<T> {
    slot: Mutex<Slot<T>>,
    listeners: Listeners<QueryState<T>>,
}

impl<T: Clone + Send + Sync + 'static> ReadModel<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: QueryState::default(),
                latest_request: 0,
            }),
            listeners: Listeners::new(),
        }
    }

    pub fn state(&self) -> QueryState<T> {
        self.lock().state.clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&QueryState<T>) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Runs one fetch and records its result.
    ///
    /// Previous data stays visible while loading.
    pub async fn load<F>(&self, fetch: F)
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let (request, published) = {
            let mut slot = self.lock();
            slot.latest_request += 1;
            slot.state.loading = true;
            slot.state.error = None;
            (slot.latest_request, slot.state.clone())
        };
        self.listeners.notify(&published);

        let result = fetch.await;

        let published = {
            let mut slot = self.lock();
            if slot.latest_request != request {
                debug!(request, "superseded load discarded");
                return;
            }
            slot.state.loading = false;
            match result {
                Ok(data) => slot.state.data = Some(data),
                Err(err) => {
                    warn!(error = %err, "load failed");
                    slot.state.error = Some(err.to_string());
                }
            }
            slot.state.clone()
        };
        self.listeners.notify(&published);
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ReadModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that can re-query a player's stats in the background.
pub trait StatsRefresh: Send + Sync {
    fn refresh(&self, user_id: UserId);
}

/// Player statistics view.
pub struct StatsService {
    reader: Arc<dyn StatsReader>,
    model: Arc<ReadModel<UserStats>>,
}

impl StatsService {
    pub fn new(reader: Arc<dyn StatsReader>) -> Self {
        Self {
            reader,
            model: Arc::new(ReadModel::new()),
        }
    }

    pub fn model(&self) -> &ReadModel<UserStats> {
        &self.model
    }

    pub async fn load(&self, user_id: UserId) {
        self.model.load(self.reader.fetch_stats(user_id)).await;
    }
}

impl StatsRefresh for StatsService {
    /// Spawns the fetch on the current tokio runtime.
    fn refresh(&self, user_id: UserId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(%user_id, "stats refresh requested outside a runtime, skipped");
            return;
        };
        let reader = self.reader.clone();
        let model = self.model.clone();
        runtime.spawn(async move {
            model.load(reader.fetch_stats(user_id)).await;
        });
    }
}

/// Paged game history of the current player.
pub struct HistoryService {
    reader: Arc<dyn HistoryReader>,
    model: ReadModel<Vec<HistoryEntry>>,
    page: Mutex<HistoryPage>,
}

impl HistoryService {
    pub fn new(reader: Arc<dyn HistoryReader>) -> Self {
        Self {
            reader,
            model: ReadModel::new(),
            page: Mutex::new(HistoryPage::first()),
        }
    }

    pub fn model(&self) -> &ReadModel<Vec<HistoryEntry>> {
        &self.model
    }

    pub fn page(&self) -> HistoryPage {
        *self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Loads one page and remembers it as current.
    pub async fn load(&self, page: HistoryPage) {
        *self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = page;
        self.model.load(self.reader.fetch_history(page)).await;
    }

    pub async fn load_next(&self) {
        self.load(self.page().next()).await;
    }
}

/// Top players.
pub struct LeaderboardService {
    reader: Arc<dyn LeaderboardReader>,
    model: ReadModel<Vec<LeaderboardEntry>>,
}

impl LeaderboardService {
    pub fn new(reader: Arc<dyn LeaderboardReader>) -> Self {
        Self {
            reader,
            model: ReadModel::new(),
        }
    }

    pub fn model(&self) -> &ReadModel<Vec<LeaderboardEntry>> {
        &self.model
    }

    pub async fn load(&self) {
        self.model.load(self.reader.fetch_leaderboard()).await;
    }
}
