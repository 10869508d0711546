//! In-memory transport for testing.
//!
//! `InMemoryConnector` hands out scripted connections. Each accepted
//! connection has an `InMemoryPeer` that plays the server: it pushes frames
//! to the client, inspects what the client sent, and can drop the link.
//!
//! # Example
//!
//! ```ignore
//! let connector = InMemoryConnector::new();
//! let mut peer = connector.accept_next();
//!
//! // ... client connects ...
//! peer.push_json(&json!({"type": "session_info", "session": {"session_id": "r1"}}));
//! assert_eq!(peer.sent_json()[0]["type"], "select_number");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::ports::{Connector, Transport, TransportError};

enum Scripted {
    Accept(InMemoryTransport),
    Refuse(String),
}

#[derive(Default)]
struct ConnectorState {
    script: VecDeque<Scripted>,
    urls: Vec<String>,
}

/// Connector that serves pre-scripted connections in order.
///
/// An attempt with nothing scripted is refused.
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl InMemoryConnector {
    /// Creates a connector with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next attempt to succeed and returns the server side.
    pub fn accept_next(&self) -> InMemoryPeer {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        self.lock().script.push_back(Scripted::Accept(InMemoryTransport {
            inbound,
            outbound,
            closed: closed.clone(),
        }));

        InMemoryPeer {
            to_client: Some(to_client),
            from_client,
            closed,
        }
    }

    /// Scripts the next attempt to fail.
    pub fn refuse_next(&self, reason: impl Into<String>) {
        self.lock().script.push_back(Scripted::Refuse(reason.into()));
    }

    /// Number of connection attempts so far.
    pub fn attempts(&self) -> usize {
        self.lock().urls.len()
    }

    /// URLs of all attempts, in order.
    pub fn urls(&self) -> Vec<String> {
        self.lock().urls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        let next = {
            let mut state = self.lock();
            state.urls.push(url.to_string());
            state.script.pop_front()
        };
        match next {
            Some(Scripted::Accept(transport)) => Ok(Box::new(transport)),
            Some(Scripted::Refuse(reason)) => Err(TransportError::Connect(reason)),
            None => Err(TransportError::Connect("no scripted connection".into())),
        }
    }
}

/// Client side of a scripted connection.
pub struct InMemoryTransport {
    inbound: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(text)
            .map_err(|_| TransportError::Send("peer dropped".into()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inbound.close();
        Ok(())
    }
}

/// Server side of a scripted connection.
pub struct InMemoryPeer {
    to_client: Option<mpsc::UnboundedSender<Result<String, TransportError>>>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl InMemoryPeer {
    /// Delivers a raw text frame. Returns false if the link is gone.
    pub fn push(&self, text: impl Into<String>) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(Ok(text.into())).is_ok(),
            None => false,
        }
    }

    /// Delivers a JSON frame.
    pub fn push_json(&self, value: &serde_json::Value) -> bool {
        self.push(value.to_string())
    }

    /// Delivers a receive error.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(Err(TransportError::Receive(reason.into()))).is_ok(),
            None => false,
        }
    }

    /// Drops the link from the server side. The client sees a clean close.
    pub fn disconnect(&mut self) {
        self.to_client = None;
    }

    /// Drains frames the client has sent since the last call.
    pub fn sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Drains sent frames parsed as JSON. Unparseable frames are skipped.
    pub fn sent_json(&mut self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// True once the client closed its side.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn accepted_connection_carries_frames_both_ways() {
        let connector = InMemoryConnector::new();
        let mut peer = connector.accept_next();

        let mut transport = connector.connect("ws://test/").await.unwrap();
        transport.send("hello".into()).await.unwrap();
        peer.push_json(&json!({"type": "error", "message": "x"}));

        assert_eq!(peer.sent(), vec!["hello"]);
        let frame = transport.recv().await.unwrap().unwrap();
        assert!(frame.contains("error"));
    }

    #[tokio::test]
    async fn unscripted_attempt_is_refused_and_recorded() {
        let connector = InMemoryConnector::new();
        connector.refuse_next("boom");

        let first = connector.connect("ws://a/").await;
        let second = connector.connect("ws://b/").await;

        assert!(matches!(first, Err(TransportError::Connect(ref r)) if r == "boom"));
        assert!(second.is_err());
        assert_eq!(connector.attempts(), 2);
        assert_eq!(connector.urls(), vec!["ws://a/", "ws://b/"]);
    }

    #[tokio::test]
    async fn disconnect_ends_stream_and_close_is_visible() {
        let connector = InMemoryConnector::new();
        let mut peer = connector.accept_next();
        let mut transport = connector.connect("ws://test/").await.unwrap();

        peer.disconnect();
        assert!(transport.recv().await.is_none());

        transport.close().await.unwrap();
        assert!(peer.is_closed());
        assert_eq!(
            transport.send("late".into()).await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn fail_delivers_receive_error() {
        let connector = InMemoryConnector::new();
        let peer = connector.accept_next();
        let mut transport = connector.connect("ws://test/").await.unwrap();

        peer.fail("reset by peer");

        assert_eq!(
            transport.recv().await,
            Some(Err(TransportError::Receive("reset by peer".into())))
        );
    }
}
