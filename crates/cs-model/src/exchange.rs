//! ModelExchange trait for pluggable lumped models.

use crate::error::ModelResult;

/// Event information reported by a model after a step or an event iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EventInfo {
    /// Another `event_update` call is required before leaving event mode.
    pub new_discrete_states_needed: bool,
    /// The model asks the caller to stop integrating.
    pub terminate_simulation: bool,
    /// Continuous states were changed by the event; callers must re-read them.
    pub values_of_continuous_states_changed: bool,
    /// Next scheduled time event, if any.
    pub next_event_time: Option<f64>,
}

/// Interface implemented by a loaded model artifact.
///
/// Mode bookkeeping lives in [`crate::ModelSession`]; implementors only
/// need to honor the calls in the order the session issues them.
pub trait ModelExchange {
    /// Model name for diagnostics.
    fn model_name(&self) -> &str;

    /// Set the start time before initialization.
    fn setup_experiment(&mut self, start_time: f64) -> ModelResult<()>;

    fn enter_initialization_mode(&mut self) -> ModelResult<()> {
        Ok(())
    }

    /// Finish applying initial conditions. Discrete states are resolved here.
    fn exit_initialization_mode(&mut self) -> ModelResult<()>;

    fn enter_event_mode(&mut self) -> ModelResult<()> {
        Ok(())
    }

    fn enter_continuous_time_mode(&mut self) -> ModelResult<()> {
        Ok(())
    }

    /// One event iteration: re-resolve discrete states at the current time.
    fn event_update(&mut self) -> ModelResult<EventInfo>;

    /// Event information as of the last step or event iteration.
    fn event_info(&self) -> EventInfo;

    fn set_time(&mut self, t: f64) -> ModelResult<()>;

    fn continuous_states(&self) -> Vec<f64>;

    fn set_continuous_states(&mut self, x: &[f64]) -> ModelResult<()>;

    fn nominal_continuous_states(&self) -> Vec<f64>;

    /// Right-hand side `dx/dt` at the current time and states.
    fn derivatives(&mut self) -> ModelResult<Vec<f64>>;

    /// Event indicators; a sign change between evaluations is a state event.
    fn event_indicators(&mut self) -> ModelResult<Vec<f64>>;

    /// Inform the model an integrator step was accepted. Returns whether a
    /// step event is pending.
    fn completed_integrator_step(&mut self) -> ModelResult<bool>;

    fn get_real(&self, name: &str) -> ModelResult<f64>;

    fn set_real(&mut self, name: &str, value: f64) -> ModelResult<()>;

    fn terminate(&mut self) -> ModelResult<()> {
        Ok(())
    }
}
