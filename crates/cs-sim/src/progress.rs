//! Driver phases and progress snapshots.

use std::fmt;

/// `Idle → Initializing → Integrating ⇄ EventHandling → Exchanging → ... → Finished | Aborted`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverPhase {
    Idle,
    Initializing,
    Integrating,
    EventHandling,
    Exchanging,
    Finished,
    Aborted,
}

impl DriverPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverPhase::Idle => "idle",
            DriverPhase::Initializing => "initializing",
            DriverPhase::Integrating => "integrating",
            DriverPhase::EventHandling => "event-handling",
            DriverPhase::Exchanging => "exchanging",
            DriverPhase::Finished => "finished",
            DriverPhase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DriverPhase::Finished | DriverPhase::Aborted)
    }
}

impl fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot handed to the progress callback after every accepted step.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverProgress {
    pub phase: DriverPhase,
    pub t: f64,
    pub t_end: f64,
    pub fraction: f64,
    pub step: usize,
    pub events: usize,
    pub exchanges: usize,
}
