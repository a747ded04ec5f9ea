//! Result data types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub name: String,
    pub timestamp: String,
    /// Short random tag naming the solver report files of this run.
    pub run_tag: String,
    pub status: RunStatus,
    /// `"<Class>: <message>"` when the run was aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub t_end_s: f64,
    pub dt_s: f64,
    pub t_final_s: f64,
    pub steps: usize,
    pub events: usize,
    pub exchanges: usize,
    pub driver_version: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Finished,
    Aborted,
}

/// Observables sampled after one accepted step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeseriesRecord {
    pub time_s: f64,
    pub values: BTreeMap<String, f64>,
}
