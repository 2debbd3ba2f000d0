//! Received protocol messages.

use std::time::SystemTime;

use foldmon_pyon::Frame;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Wire keys of the messages a client sends.
pub mod keys {
    pub const HEARTBEAT: &str = "heartbeat";
    pub const INFO: &str = "info";
    pub const OPTIONS: &str = "options";
    pub const SIMULATION_INFO: &str = "simulation-info";
    pub const SLOTS: &str = "slots";
    pub const SLOT_OPTIONS: &str = "slot-options";
    pub const UNITS: &str = "units";
    pub const LOG_RESTART: &str = "log-restart";
    pub const LOG_UPDATE: &str = "log-update";
}

/// One message from the client: its key and JSON-normalized body.
///
/// The body is kept as text; typed parsing happens in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    key: String,
    value: String,
    received_at: SystemTime,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::received(key, value, SystemTime::now())
    }

    /// Create a message with an explicit arrival time.
    pub fn received(key: impl Into<String>, value: impl Into<String>, at: SystemTime) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            received_at: at,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    /// Deserialize the body.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.value)?)
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        Self::new(frame.key, frame.value)
    }
}
