//! Latest-value cache of received messages.
//!
//! Every key holds the most recent message, except the two streaming log
//! keys which fold into one aggregated [`LOG_KEY`] entry:
//!
//! - `log-restart` replaces the aggregated log outright
//! - `log-update` appends to it (or starts it if absent)
//!
//! Log payloads arrive as quoted string literals; the aggregated entry holds
//! the decoded text so that consecutive chunks concatenate cleanly.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::message::{keys, Message};
use crate::models::LogText;

/// Key of the aggregated log entry.
pub const LOG_KEY: &str = "log";

/// Wire key that starts a fresh log.
pub const LOG_RESTART_KEY: &str = keys::LOG_RESTART;

/// Wire key that carries new log lines.
pub const LOG_UPDATE_KEY: &str = keys::LOG_UPDATE;

/// Keyed store of the newest message per key.
#[derive(Debug, Default)]
pub struct MessageCache {
    entries: RwLock<HashMap<String, Message>>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one message into the cache.
    ///
    /// Returns the key the message was stored under.
    pub fn update(&self, message: &Message) -> String {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        match message.key() {
            LOG_RESTART_KEY => {
                let text = decode_log_text(message.value());
                entries.insert(
                    LOG_KEY.to_string(),
                    Message::received(LOG_KEY, text, message.received_at()),
                );
                LOG_KEY.to_string()
            }
            LOG_UPDATE_KEY => {
                let mut text = entries
                    .get(LOG_KEY)
                    .map(|existing| existing.value().to_string())
                    .unwrap_or_default();
                text.push_str(&decode_log_text(message.value()));
                entries.insert(
                    LOG_KEY.to_string(),
                    Message::received(LOG_KEY, text, message.received_at()),
                );
                LOG_KEY.to_string()
            }
            key => {
                entries.insert(key.to_string(), message.clone());
                key.to_string()
            }
        }
    }

    /// Cached message for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Message> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// The aggregated log.
    pub fn log(&self) -> Option<Message> {
        self.get(LOG_KEY)
    }

    /// All cached keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

fn decode_log_text(value: &str) -> String {
    LogText::from_payload(value).0
}
