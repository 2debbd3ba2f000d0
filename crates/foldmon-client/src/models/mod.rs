//! Typed records for the messages a Folding@Home client sends.
//!
//! All records tolerate missing fields (they become `None`) and ignore
//! fields they do not know. Numeric fields accept either JSON numbers or
//! numeric strings, since the client uses both.

mod info;
mod lenient;
mod log;
mod options;
mod simulation;
mod slot;
mod unit;

pub use info::{Info, InfoSection};
pub use log::LogText;
pub use options::{Options, SlotOptions};
pub use simulation::SimulationInfo;
pub use slot::{Slot, SlotStatus};
pub use unit::Unit;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Heartbeat counter sent periodically by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub sequence: u64,
}

impl<'de> Deserialize<'de> for Heartbeat {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        lenient::u64_or_zero(d).map(|sequence| Heartbeat { sequence })
    }
}

/// Parse a list payload.
///
/// Accepts a bracketed array or the legacy form with the brackets stripped,
/// i.e. a bare comma-separated run of elements.
pub(crate) fn parse_list<T: DeserializeOwned>(value: &str) -> serde_json::Result<Vec<T>> {
    match serde_json::from_str(value) {
        Ok(list) => Ok(list),
        Err(e) => {
            let trimmed = value.trim();
            if trimmed.starts_with('[') {
                return Err(e);
            }
            if trimmed.is_empty() {
                return Ok(Vec::new());
            }
            serde_json::from_str(&format!("[{}]", trimmed))
        }
    }
}
