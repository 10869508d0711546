//! Application layer - the session client and the read models.
//!
//! This layer orchestrates the round projection and the ports:
//! - `channel` keeps one transport connection alive
//! - `session_client` folds inbound frames into the projection and exposes
//!   commands and subscriptions
//! - `read_models` wrap the HTTP read ports in observable loading state

pub mod channel;
pub mod read_models;
pub mod session_client;
pub mod subscribers;

pub use channel::{
    ChannelConfig, FrameFollowUp, InboundHandler, Outbound, TransportChannel, DEFAULT_WS_URL,
};
pub use read_models::{
    HistoryService, LeaderboardService, QueryState, ReadModel, StatsRefresh, StatsService,
};
pub use session_client::{ClientConfig, PickSubmission, SessionClient, PICK_RANGE};
pub use subscribers::{Listeners, SessionHub, SubscriptionId};
