//! Communication cadence: when an event triggers an exchange.
//!
//! Two policies exist. `EventCount` reproduces the legacy gate, where every
//! event adds a fixed increment to a counter and an exchange happens once
//! the counter reaches `every`; the exchange rate then follows event
//! density, not time. `SimTime` exchanges every `every` seconds of simulated
//! time and schedules those instants as time events, so they are hit exactly.

use cs_core::EVENT_TIME_TOL;

use crate::error::{SimError, SimResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CadencePolicy {
    EventCount { every: f64, increment: f64 },
    SimTime { every: f64 },
}

impl CadencePolicy {
    pub fn validate(&self) -> SimResult<()> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        match *self {
            CadencePolicy::EventCount { every, increment } => {
                if !ok(every) {
                    return Err(SimError::InvalidArg {
                        what: "cadence interval must be positive",
                    });
                }
                if !ok(increment) {
                    return Err(SimError::InvalidArg {
                        what: "cadence increment must be positive",
                    });
                }
            }
            CadencePolicy::SimTime { every } => {
                if !ok(every) {
                    return Err(SimError::InvalidArg {
                        what: "cadence interval must be positive",
                    });
                }
            }
        }
        Ok(())
    }
}

/// Events that must accumulate before an exchange: `⌈every / increment⌉`,
/// at least one. The small slack keeps `0.3 / 0.1` at 3.
pub fn required_events(every: f64, increment: f64) -> u64 {
    let ratio = every / increment - 1e-9;
    (ratio.ceil().max(1.0)) as u64
}

/// Communication state carried by the driver across events.
#[derive(Clone, Debug)]
pub struct CommunicationCounter {
    policy: CadencePolicy,
    events: u64,
    required: u64,
    next_comm: f64,
}

impl CommunicationCounter {
    pub fn new(policy: CadencePolicy, t_start: f64) -> Self {
        let (required, next_comm) = match policy {
            CadencePolicy::EventCount { every, increment } => {
                (required_events(every, increment), f64::INFINITY)
            }
            CadencePolicy::SimTime { every } => (0, t_start + every),
        };
        Self {
            policy,
            events: 0,
            required,
            next_comm,
        }
    }

    pub fn policy(&self) -> CadencePolicy {
        self.policy
    }

    /// Whether an event at `t` performs an exchange. Checked before the
    /// event is counted.
    pub fn is_due(&self, t: f64) -> bool {
        match self.policy {
            CadencePolicy::EventCount { .. } => self.events >= self.required,
            CadencePolicy::SimTime { .. } => t >= self.next_comm - EVENT_TIME_TOL,
        }
    }

    /// Count one event, whether or not it exchanged.
    pub fn record_event(&mut self) {
        if let CadencePolicy::EventCount { .. } = self.policy {
            self.events += 1;
        }
    }

    /// Start a new communication interval after an exchange at `t`.
    pub fn reset(&mut self, t: f64) {
        match self.policy {
            CadencePolicy::EventCount { .. } => self.events = 0,
            CadencePolicy::SimTime { every } => {
                while self.next_comm <= t + EVENT_TIME_TOL {
                    self.next_comm += every;
                }
            }
        }
    }

    /// Next communication instant, scheduled as a time event.
    pub fn next_comm_time(&self) -> Option<f64> {
        match self.policy {
            CadencePolicy::EventCount { .. } => None,
            CadencePolicy::SimTime { .. } => Some(self.next_comm),
        }
    }

    /// Legacy counter value: events since the last exchange times the increment.
    pub fn accumulated(&self) -> f64 {
        match self.policy {
            CadencePolicy::EventCount { increment, .. } => self.events as f64 * increment,
            CadencePolicy::SimTime { .. } => 0.0,
        }
    }
}
