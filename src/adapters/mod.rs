//! Adapters - Implementations of port interfaces.
//!
//! - `websocket` - Session connection (tokio-tungstenite) and the protocol codec
//! - `http` - Read-side REST API (reqwest)
//! - `credentials` - Credential storage

pub mod credentials;
pub mod http;
pub mod websocket;
