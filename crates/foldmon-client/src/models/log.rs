//! Log text carried by `log-restart` and `log-update`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::lenient;

/// A chunk of client log text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogText(pub String);

impl LogText {
    /// Decode a payload: a quoted literal is unescaped, anything else is kept as is.
    pub fn from_payload(value: &str) -> Self {
        Self(serde_json::from_str::<String>(value).unwrap_or_else(|_| value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty lines of the chunk.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.lines().filter(|line| !line.trim().is_empty())
    }
}

impl<'de> Deserialize<'de> for LogText {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Self(lenient::text(&Value::deserialize(d)?).unwrap_or_default()))
    }
}
