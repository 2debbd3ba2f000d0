//! Entries of the `slots` list.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::lenient;
use super::options::SlotOptions;

/// Scheduling state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Paused,
    Running,
    Finishing,
    Ready,
    Stopping,
    Failed,
    Disabled,
    #[serde(other)]
    Unknown,
}

/// One unit of schedulable compute capacity (a CPU group or a GPU).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Slot {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default = "unknown_status", deserialize_with = "lenient_status")]
    pub status: SlotStatus,
    /// e.g. `cpu:4` or `gpu:0:TU104 [GeForce RTX 2080]`
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub idle: Option<bool>,
    #[serde(default)]
    pub options: Option<SlotOptions>,
}

fn unknown_status() -> SlotStatus {
    SlotStatus::Unknown
}

/// Anything other than a known status string is `Unknown`.
fn lenient_status<'de, D: Deserializer<'de>>(d: D) -> Result<SlotStatus, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => serde_json::from_value(Value::String(s.trim().to_uppercase()))
            .unwrap_or(SlotStatus::Unknown),
        _ => SlotStatus::Unknown,
    })
}

impl Slot {
    /// Numeric slot id (`"01"` -> 1).
    pub fn number(&self) -> Option<u32> {
        self.id.as_deref()?.trim().parse().ok()
    }

    pub fn is_gpu(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| d.starts_with("gpu"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_list;

    #[test]
    fn test_slot_list() {
        let slots: Vec<Slot> = parse_list(
            r#"[
  {"id": "00", "status": "RUNNING", "description": "cpu:15", "options": {"paused": false}, "reason": "", "idle": false},
  {"id": "01", "status": "PAUSED", "description": "gpu:0:TU104 [GeForce RTX 2080]", "options": {}, "reason": "paused", "idle": false},
  {"id": "02", "status": "WEIRD"}
]"#,
        )
        .unwrap();

        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].status, SlotStatus::Running);
        assert_eq!(slots[0].number(), Some(0));
        assert!(!slots[0].is_gpu());
        assert_eq!(slots[0].options.as_ref().and_then(|o| o.paused), Some(false));
        assert_eq!(slots[1].status, SlotStatus::Paused);
        assert!(slots[1].is_gpu());
        assert_eq!(slots[2].status, SlotStatus::Unknown);
        assert_eq!(slots[2].description, None);
    }

    #[test]
    fn test_odd_status_values_keep_the_list() {
        let slots: Vec<Slot> = parse_list(
            r#"[{"id": "00", "status": null}, {"id": "01", "status": 3}, {"id": "02", "status": " ready"}, {"id": "03"}]"#,
        )
        .unwrap();

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].status, SlotStatus::Unknown);
        assert_eq!(slots[1].status, SlotStatus::Unknown);
        assert_eq!(slots[2].status, SlotStatus::Ready);
        assert_eq!(slots[3].status, SlotStatus::Unknown);
    }
}
