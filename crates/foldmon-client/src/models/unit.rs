//! Entries of the `units` (queue) list.

use serde::Deserialize;

use super::lenient;

/// A work assignment tracked by the client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Unit {
    /// Queue id, e.g. `"01"`
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    /// `RUNNING`, `READY`, `DOWNLOAD`, `SEND`, ...
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub project: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub run: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub clone: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub gen: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub core: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub percentdone: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub eta: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub ppd: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub creditestimate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub waitingon: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub nextattempt: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timeremaining: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub totalframes: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub framesdone: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub assigned: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timeout: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub ws: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cs: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub attempts: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub slot: Option<String>,
    /// Time per frame, e.g. `"2 mins 05 secs"`
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tpf: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub basecredit: Option<f64>,
}

impl Unit {
    pub fn is_running(&self) -> bool {
        self.state.as_deref() == Some("RUNNING")
    }

    /// Project/run/clone/gen as `P11777 (R0, C17, G79)`.
    pub fn prcg(&self) -> Option<String> {
        Some(format!(
            "P{} (R{}, C{}, G{})",
            self.project?, self.run?, self.clone?, self.gen?
        ))
    }

    /// Slot number the unit is assigned to.
    pub fn slot_number(&self) -> Option<u32> {
        self.slot.as_deref()?.trim().parse().ok()
    }
}
