//! Typed projection of received messages.
//!
//! [`MessageRegistry`] maps a wire key to a factory that parses the
//! normalized body into a [`TypedMessage`]. Projection is best effort: an
//! unknown key or a body that does not parse yields no typed payload, and
//! the raw message is still delivered.

use std::collections::HashMap;
use std::fmt;

use crate::events::MessageEvent;
use crate::message::{keys, Message};
use crate::models::{
    parse_list, Heartbeat, Info, LogText, Options, SimulationInfo, Slot, SlotOptions, Unit,
};

/// Parsed message body, one variant per known key.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedMessage {
    Heartbeat(Heartbeat),
    Info(Info),
    Options(Options),
    SimulationInfo(SimulationInfo),
    Slots(Vec<Slot>),
    SlotOptions(SlotOptions),
    Units(Vec<Unit>),
    LogRestart(LogText),
    LogUpdate(LogText),
    /// Produced by factories registered for additional keys.
    Other(serde_json::Value),
}

impl TypedMessage {
    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Heartbeat(_) => "heartbeat",
            Self::Info(_) => "info",
            Self::Options(_) => "options",
            Self::SimulationInfo(_) => "simulation-info",
            Self::Slots(_) => "slots",
            Self::SlotOptions(_) => "slot-options",
            Self::Units(_) => "units",
            Self::LogRestart(_) => "log-restart",
            Self::LogUpdate(_) => "log-update",
            Self::Other(_) => "other",
        }
    }
}

/// Parses a normalized message body.
pub type Factory = Box<dyn Fn(&str) -> serde_json::Result<TypedMessage> + Send + Sync>;

/// Table of wire key to typed factory.
pub struct MessageRegistry {
    factories: HashMap<String, Factory>,
}

impl MessageRegistry {
    /// A registry with no entries; every message dispatches untyped.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry covering every key the client is known to send.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(keys::HEARTBEAT, |v| {
            Ok(TypedMessage::Heartbeat(serde_json::from_str(v)?))
        });
        registry.register(keys::INFO, |v| Ok(TypedMessage::Info(serde_json::from_str(v)?)));
        registry.register(keys::OPTIONS, |v| {
            Ok(TypedMessage::Options(serde_json::from_str(v)?))
        });
        registry.register(keys::SIMULATION_INFO, |v| {
            Ok(TypedMessage::SimulationInfo(serde_json::from_str(v)?))
        });
        registry.register(keys::SLOTS, |v| Ok(TypedMessage::Slots(parse_list(v)?)));
        registry.register(keys::SLOT_OPTIONS, |v| {
            Ok(TypedMessage::SlotOptions(serde_json::from_str(v)?))
        });
        registry.register(keys::UNITS, |v| Ok(TypedMessage::Units(parse_list(v)?)));
        registry.register(keys::LOG_RESTART, |v| {
            Ok(TypedMessage::LogRestart(LogText::from_payload(v)))
        });
        registry.register(keys::LOG_UPDATE, |v| {
            Ok(TypedMessage::LogUpdate(LogText::from_payload(v)))
        });
        registry
    }

    /// Add or replace the factory for `key`.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> serde_json::Result<TypedMessage> + Send + Sync + 'static,
    {
        self.factories.insert(key.into(), Box::new(factory));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Parse `message` into its typed form, if the key is known and the body parses.
    pub fn project(&self, message: &Message) -> Option<TypedMessage> {
        let factory = self.factories.get(message.key())?;
        match factory(message.value()) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::debug!(key = message.key(), error = %e, "typed projection failed");
                None
            }
        }
    }

    /// Pair a message with its typed projection.
    pub fn dispatch(&self, message: Message) -> MessageEvent {
        let typed = self.project(&message);
        MessageEvent { message, typed }
    }
}

impl Default for MessageRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for MessageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
