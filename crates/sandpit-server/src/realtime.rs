//! Client for a Phoenix-style realtime status channel.
//!
//! The channel carries task and agent notifications from the generation
//! backend. It is explicitly constructed and owns its connection lifecycle;
//! the wire itself is behind [`Transport`], and inbound frames are pushed in
//! with [`StatusChannel::handle_frame`] by whoever reads the transport.
//!
//! Nothing in this workspace connects one yet: the dev server does not talk
//! to the generation backend, and no network [`Transport`] ships here.
//! Embedders supply their own.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const TASKS_TOPIC: &str = "tasks:lobby";
pub const AGENTS_TOPIC: &str = "agents:lobby";

/// A channel frame: `{topic, event, payload, ref}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

/// Errors from the status channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Gave up reconnecting after {0} attempts")]
    ReconnectExhausted(u32),
}

/// The wire under a [`StatusChannel`].
pub trait Transport: Send {
    fn open(&mut self) -> Result<(), ChannelError>;
    fn send(&mut self, frame: &str) -> Result<(), ChannelError>;
    fn close(&mut self);
}

/// Notifications dispatched to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    TaskCreated(Value),
    TaskCompleted(Value),
    AgentStatusChange(Value),
}

impl ChannelEvent {
    fn from_frame(frame: Frame) -> Option<Self> {
        match frame.event.as_str() {
            "task_created" => Some(Self::TaskCreated(frame.payload)),
            "task_completed" => Some(Self::TaskCompleted(frame.payload)),
            "agent_status_change" => Some(Self::AgentStatusChange(frame.payload)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// Transport closed underneath us; `attempts` made so far
    Reconnecting { attempts: u32 },
}

type Subscriber = Box<dyn Fn(&ChannelEvent) + Send>;

/// Realtime status channel client.
pub struct StatusChannel<T: Transport> {
    transport: T,
    state: ConnectionState,
    subscribers: Vec<Subscriber>,
    next_ref: u64,
    max_attempts: u32,
}

impl<T: Transport> StatusChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            subscribers: Vec::new(),
            next_ref: 0,
            max_attempts: 5,
        }
    }

    /// Limit how many times [`reconnect`](Self::reconnect) may be tried.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the transport and join both lobbies. No-op when connected.
    pub fn connect(&mut self) -> Result<(), ChannelError> {
        if self.is_connected() {
            return Ok(());
        }

        self.transport.open()?;
        self.state = ConnectionState::Connected;
        tracing::info!("Status channel connected");

        self.join(TASKS_TOPIC)?;
        self.join(AGENTS_TOPIC)
    }

    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.transport.close();
            self.state = ConnectionState::Disconnected;
            tracing::info!("Status channel disconnected");
        }
    }

    pub fn subscribe(&mut self, subscriber: impl Fn(&ChannelEvent) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Decode an inbound frame and dispatch it.
    ///
    /// Frames that do not parse or carry an unknown event are dropped.
    pub fn handle_frame(&mut self, raw: &str) -> Option<ChannelEvent> {
        let frame: Frame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Error parsing status frame: {}", e);
                return None;
            }
        };

        let event = ChannelEvent::from_frame(frame)?;
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
        Some(event)
    }

    /// Ask the backend to start a task.
    pub fn create_task(&mut self, description: &str) -> Result<(), ChannelError> {
        self.push(TASKS_TOPIC, "new_task", json!({ "description": description }))
    }

    /// Ask the backend for agent status; the answer arrives as an event.
    pub fn request_agent_status(&mut self) -> Result<(), ChannelError> {
        self.push(AGENTS_TOPIC, "get_status", json!({}))
    }

    /// Record that the transport closed on its own.
    pub fn transport_closed(&mut self) {
        if self.is_connected() {
            tracing::warn!("Status channel closed, reconnect pending");
            self.state = ConnectionState::Reconnecting { attempts: 0 };
        }
    }

    /// Try once to reopen a closed transport.
    ///
    /// Gives up for good after `max_attempts` failures, leaving the channel
    /// disconnected.
    pub fn reconnect(&mut self) -> Result<(), ChannelError> {
        let ConnectionState::Reconnecting { attempts } = self.state else {
            return Ok(());
        };
        let attempts = attempts + 1;
        tracing::info!("Attempting to reconnect ({}/{})", attempts, self.max_attempts);

        match self.transport.open() {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.join(TASKS_TOPIC)?;
                self.join(AGENTS_TOPIC)
            }
            Err(e) if attempts >= self.max_attempts => {
                tracing::warn!("Reconnect failed: {}", e);
                self.state = ConnectionState::Disconnected;
                Err(ChannelError::ReconnectExhausted(attempts))
            }
            Err(e) => {
                self.state = ConnectionState::Reconnecting { attempts };
                Err(e)
            }
        }
    }

    fn join(&mut self, topic: &str) -> Result<(), ChannelError> {
        self.push(topic, "phx_join", json!({}))
    }

    fn push(&mut self, topic: &str, event: &str, payload: Value) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }

        self.next_ref += 1;
        let frame = Frame {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            reference: Some(self.next_ref.to_string()),
        };
        let text = serde_json::to_string(&frame).map_err(|e| ChannelError::Encode(e.to_string()))?;

        self.transport.send(&text)
    }
}

impl<T: Transport> Drop for StatusChannel<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryTransport {
        sent: Vec<Frame>,
        open: bool,
        failing_opens: u32,
    }

    impl Transport for MemoryTransport {
        fn open(&mut self) -> Result<(), ChannelError> {
            if self.failing_opens > 0 {
                self.failing_opens -= 1;
                return Err(ChannelError::Transport("connection refused".to_string()));
            }
            self.open = true;
            Ok(())
        }

        fn send(&mut self, frame: &str) -> Result<(), ChannelError> {
            self.sent.push(serde_json::from_str(frame).unwrap());
            Ok(())
        }

        fn close(&mut self) {
            self.open = false;
        }
    }

    fn events(channel: &StatusChannel<MemoryTransport>) -> Vec<(&str, &str)> {
        channel
            .transport()
            .sent
            .iter()
            .map(|f| (f.topic.as_str(), f.event.as_str()))
            .collect()
    }

    #[test]
    fn joins_lobbies_on_connect() {
        let mut channel = StatusChannel::new(MemoryTransport::default());
        channel.connect().unwrap();
        channel.connect().unwrap();

        assert!(channel.is_connected());
        assert_eq!(
            events(&channel),
            vec![(TASKS_TOPIC, "phx_join"), (AGENTS_TOPIC, "phx_join")]
        );
    }

    #[test]
    fn requests_fail_when_disconnected() {
        let mut channel = StatusChannel::new(MemoryTransport::default());

        assert!(matches!(channel.create_task("build a card"), Err(ChannelError::NotConnected)));
        assert!(matches!(channel.request_agent_status(), Err(ChannelError::NotConnected)));
        assert!(channel.transport().sent.is_empty());
    }

    #[test]
    fn sends_task_and_status_requests() {
        let mut channel = StatusChannel::new(MemoryTransport::default());
        channel.connect().unwrap();
        channel.create_task("build a card").unwrap();
        channel.request_agent_status().unwrap();

        let sent = &channel.transport().sent;
        assert_eq!(sent[2].event, "new_task");
        assert_eq!(sent[2].payload, json!({ "description": "build a card" }));
        assert_eq!(sent[3].topic, AGENTS_TOPIC);
        assert_eq!(sent[3].event, "get_status");
        assert_ne!(sent[2].reference, sent[3].reference);
    }

    #[test]
    fn dispatches_known_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut channel = StatusChannel::new(MemoryTransport::default());
        let sink = Arc::clone(&seen);
        channel.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let event = channel.handle_frame(
            r#"{"topic":"tasks:lobby","event":"task_completed","payload":{"id":7},"ref":null}"#,
        );
        channel.handle_frame(r#"{"topic":"tasks:lobby","event":"phx_reply","payload":{}}"#);
        channel.handle_frame("not json");

        assert_eq!(event, Some(ChannelEvent::TaskCompleted(json!({ "id": 7 }))));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn reconnects_on_demand() {
        let mut channel = StatusChannel::new(MemoryTransport::default());
        channel.connect().unwrap();
        channel.transport_closed();
        assert_eq!(channel.state(), ConnectionState::Reconnecting { attempts: 0 });
        assert!(matches!(channel.create_task("x"), Err(ChannelError::NotConnected)));

        channel.transport.failing_opens = 1;
        assert!(channel.reconnect().is_err());
        assert_eq!(channel.state(), ConnectionState::Reconnecting { attempts: 1 });

        channel.reconnect().unwrap();
        assert!(channel.is_connected());
        assert_eq!(events(&channel).len(), 4);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut channel = StatusChannel::new(MemoryTransport::default()).with_max_attempts(2);
        channel.connect().unwrap();
        channel.transport_closed();
        channel.transport.failing_opens = 10;

        assert!(matches!(channel.reconnect(), Err(ChannelError::Transport(_))));
        assert!(matches!(channel.reconnect(), Err(ChannelError::ReconnectExhausted(2))));
        assert_eq!(channel.state(), ConnectionState::Disconnected);
        assert!(channel.reconnect().is_ok());
    }

    #[test]
    fn instances_are_independent() {
        let mut first = StatusChannel::new(MemoryTransport::default());
        let second = StatusChannel::new(MemoryTransport::default());
        first.connect().unwrap();

        assert!(first.is_connected());
        assert!(!second.is_connected());
    }

    #[test]
    fn disconnect_closes_transport() {
        let mut channel = StatusChannel::new(MemoryTransport::default());
        channel.connect().unwrap();
        channel.disconnect();

        assert_eq!(channel.state(), ConnectionState::Disconnected);
        assert!(!channel.transport().open);
    }
}
