//! Client-wide `options` and per-slot `slot-options`.
//!
//! The client reports option values as strings. Well-known options get
//! named fields; everything else lands in `other`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::lenient;

/// Client-wide options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Options {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub team: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub passkey: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cause: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub power: Option<String>,
    #[serde(default, rename = "client-type", deserialize_with = "lenient::opt_string")]
    pub client_type: Option<String>,
    #[serde(default, rename = "fold-anon", deserialize_with = "lenient::opt_bool")]
    pub fold_anon: Option<bool>,
    #[serde(default, rename = "max-packet-size", deserialize_with = "lenient::opt_string")]
    pub max_packet_size: Option<String>,
    #[serde(default, rename = "next-unit-percentage", deserialize_with = "lenient::opt_u64")]
    pub next_unit_percentage: Option<u64>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Options {
    pub fn team_number(&self) -> Option<u64> {
        self.team.as_deref()?.trim().parse().ok()
    }
}

/// Options of a single slot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SlotOptions {
    #[serde(default, rename = "machine-id", deserialize_with = "lenient::opt_u64")]
    pub machine_id: Option<u64>,
    #[serde(default, rename = "client-type", deserialize_with = "lenient::opt_string")]
    pub client_type: Option<String>,
    #[serde(default, rename = "client-subtype", deserialize_with = "lenient::opt_string")]
    pub client_subtype: Option<String>,
    #[serde(default, rename = "cpu-usage", deserialize_with = "lenient::opt_u64")]
    pub cpu_usage: Option<u64>,
    #[serde(default, rename = "gpu-index", deserialize_with = "lenient::opt_u64")]
    pub gpu_index: Option<u64>,
    #[serde(default, rename = "gpu-usage", deserialize_with = "lenient::opt_u64")]
    pub gpu_usage: Option<u64>,
    #[serde(default, rename = "max-packet-size", deserialize_with = "lenient::opt_string")]
    pub max_packet_size: Option<String>,
    #[serde(default, rename = "core-priority", deserialize_with = "lenient::opt_string")]
    pub core_priority: Option<String>,
    #[serde(default, rename = "next-unit-percentage", deserialize_with = "lenient::opt_u64")]
    pub next_unit_percentage: Option<u64>,
    #[serde(default, rename = "pause-on-start", deserialize_with = "lenient::opt_bool")]
    pub pause_on_start: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub paused: Option<bool>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options() {
        let options: Options = serde_json::from_str(
            r#"{"user": "Anonymous", "team": "224497", "passkey": "********",
                "power": "full", "fold-anon": "false", "next-unit-percentage": "99",
                "allow": "127.0.0.1 192.168.0.0/24"}"#,
        )
        .unwrap();

        assert_eq!(options.user.as_deref(), Some("Anonymous"));
        assert_eq!(options.team_number(), Some(224497));
        assert_eq!(options.fold_anon, Some(false));
        assert_eq!(options.next_unit_percentage, Some(99));
        assert_eq!(
            options.other.get("allow").and_then(Value::as_str),
            Some("127.0.0.1 192.168.0.0/24")
        );
    }

    #[test]
    fn test_slot_options_with_nulls() {
        let options: SlotOptions = serde_json::from_str(
            r#"{"machine-id": "0", "client-type": "advanced", "cpu-usage": "100",
                "gpu-index": null, "paused": false, "pause-on-start": "false"}"#,
        )
        .unwrap();

        assert_eq!(options.machine_id, Some(0));
        assert_eq!(options.client_type.as_deref(), Some("advanced"));
        assert_eq!(options.cpu_usage, Some(100));
        assert_eq!(options.gpu_index, None);
        assert_eq!(options.paused, Some(false));
        assert_eq!(options.pause_on_start, Some(false));
    }
}
