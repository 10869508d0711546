//! WebSocket adapters for the session connection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       TransportChannel                               │
//! │   connect · heartbeat · reconnect · teardown                         │
//! └─────────────────────────────────────────────────────────────────────┘
//!                 │ Connector::connect            ▲ text frames
//!                 ▼                               │
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │   TungsteniteConnector (production) │ InMemoryConnector (test)        │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                                 │
//!                                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        codec::decode                                 │
//! │   text → InboundMessage (closed set + Unrecognized pass-through)     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Session protocol message types
//! - [`codec`] - Frame encoding and decoding
//! - [`tungstenite_transport`] - Real WebSocket transport
//! - [`in_memory`] - Scripted transport for tests

pub mod codec;
pub mod in_memory;
pub mod messages;
pub mod tungstenite_transport;

pub use codec::{decode, encode, CodecError};
pub use in_memory::{InMemoryConnector, InMemoryPeer, InMemoryTransport};
pub use messages::{ClientCommand, InboundMessage};
pub use tungstenite_transport::{TungsteniteConnector, TungsteniteTransport};
