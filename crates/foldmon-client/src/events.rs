//! Client events delivered to subscribers.
//!
//! Every notification the client raises travels over a single broadcast
//! channel. [`subscribe`](crate::FahClient::subscribe) hands out a receiver;
//! dropping the receiver unsubscribes. Events are delivered in the order
//! they were raised. A receiver that falls more than the configured capacity
//! behind sees `RecvError::Lagged` and loses the oldest events; the client
//! itself never blocks on a slow subscriber.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::message::Message;
use crate::registry::TypedMessage;

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Human-readable status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub message: String,
}

/// A received message together with its typed projection, if any.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub message: Message,
    /// `None` when the key is unknown or the payload did not parse.
    pub typed: Option<TypedMessage>,
}

/// Events raised by a connection.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Status report (also written to the log)
    Status(StatusMessage),
    /// Connection opened or closed
    ConnectedChanged { connected: bool },
    /// Bytes written by one command
    DataSent { bytes: usize },
    /// Bytes read during one poll tick
    DataReceived { bytes: usize },
    /// One message arrived
    Message(Arc<MessageEvent>),
    /// At least one message was folded into the cache during a poll tick
    MessagesUpdated { keys: Vec<String> },
}

/// Sending side of the event channel.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Send an event; having no subscribers is fine.
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }

    /// Log a status message and forward it to subscribers.
    pub fn status(&self, level: StatusLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            StatusLevel::Info => tracing::info!("{}", message),
            StatusLevel::Warning => tracing::warn!("{}", message),
            StatusLevel::Error => tracing::error!("{}", message),
        }
        self.emit(ClientEvent::Status(StatusMessage { level, message }));
    }
}
