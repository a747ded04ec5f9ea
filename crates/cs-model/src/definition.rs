//! Declarative lumped model definition.

use serde::{Deserialize, Serialize};

/// Lumped thermal network as stored on disk (YAML or JSON).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDefinition {
    pub name: String,
    #[serde(default)]
    pub states: Vec<StateDef>,
    #[serde(default)]
    pub inputs: Vec<InputDef>,
    #[serde(default)]
    pub links: Vec<LinkDef>,
    #[serde(default)]
    pub gains: Vec<GainDef>,
    #[serde(default)]
    pub outputs: Vec<OutputDef>,
    #[serde(default)]
    pub schedules: Vec<ScheduleDef>,
    #[serde(default)]
    pub switches: Vec<SwitchDef>,
    /// Report a step event after every accepted integrator step.
    #[serde(default)]
    pub step_events: bool,
    /// Ask the caller to stop once this time is reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<f64>,
}

/// Continuous state with heat capacity (J/K).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateDef {
    pub name: String,
    pub start: f64,
    pub capacitance: f64,
    #[serde(default = "default_nominal")]
    pub nominal: f64,
}

fn default_nominal() -> f64 {
    1.0
}

/// Settable real variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputDef {
    pub name: String,
    #[serde(default)]
    pub value: f64,
}

/// Thermal conductance `ua` (W/K) between a state and another variable.
///
/// When `other` is also a state the heat flow acts on both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkDef {
    pub state: String,
    pub other: String,
    pub ua: f64,
}

/// Heat rate `gain · source` (W) injected into a state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GainDef {
    pub state: String,
    pub source: String,
    #[serde(default = "default_gain")]
    pub gain: f64,
}

fn default_gain() -> f64 {
    1.0
}

/// Algebraic output `offset + Σ gain · variable`.
///
/// Terms may reference states, inputs, switch variables and earlier outputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputDef {
    pub name: String,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub terms: Vec<TermDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermDef {
    pub variable: String,
    #[serde(default = "default_gain")]
    pub gain: f64,
}

/// Piecewise-constant values applied to an input at time events.
///
/// `points` are `(time, value)` pairs in ascending time order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub input: String,
    pub points: Vec<(f64, f64)>,
}

/// Hysteresis switch on a monitored variable.
///
/// Turns on when `monitor < on_below`, off when `monitor > off_above`.
/// `name` reads 1.0/0.0; `output` reads `on_value`/`off_value`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchDef {
    pub name: String,
    pub monitor: String,
    pub on_below: f64,
    pub off_above: f64,
    pub output: String,
    pub on_value: f64,
    #[serde(default)]
    pub off_value: f64,
    #[serde(default)]
    pub initially_on: bool,
}
