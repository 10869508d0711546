//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Session Ports
//!
//! - `Connector` / `Transport` - The persistent session connection
//! - `CredentialProvider` - Source of the bearer credential
//!
//! ## Read Ports
//!
//! - `StatsReader` - Per-player statistics
//! - `HistoryReader` - Past participations of the current player
//! - `LeaderboardReader` - Top players

mod api_error;
mod credential_provider;
mod history_reader;
mod leaderboard_reader;
mod stats_reader;
mod transport;

pub use api_error::ApiError;
pub use credential_provider::CredentialProvider;
pub use history_reader::{HistoryEntry, HistoryPage, HistoryReader};
pub use leaderboard_reader::{LeaderboardEntry, LeaderboardReader};
pub use stats_reader::{StatsReader, UserStats};
pub use transport::{Connector, Transport, TransportError};
