//! `simulation-info`: progress of the work unit running in one slot.

use serde::Deserialize;

use super::lenient;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationInfo {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub team: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub project: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub run: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub clone: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub gen: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub core_type: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub core: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_iterations: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub iterations_done: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub energy: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub timeout: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub deadline: Option<i64>,
    /// Seconds the unit has been running.
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub run_time: Option<i64>,
    /// Estimated seconds remaining.
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub eta: Option<i64>,
    /// Fraction complete in `0.0..=1.0`.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub progress: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub slot: Option<u64>,
}

impl SimulationInfo {
    /// Percent complete, preferring the iteration counters.
    pub fn percent_done(&self) -> Option<f64> {
        match (self.iterations_done, self.total_iterations) {
            (Some(done), Some(total)) if total > 0 => Some(done as f64 * 100.0 / total as f64),
            _ => self.progress.map(|p| p * 100.0),
        }
    }
}
