//! Model session: owns one loaded model and its integration state.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ModelError, ModelResult};
use crate::exchange::{EventInfo, ModelExchange};
use crate::integrator::ForwardEuler;
use crate::lumped::LumpedModel;

/// Session mode.
///
/// `Uninitialized → Initializing → EventResolving → Continuous ⇄ EventResolving → ... → Terminated`.
/// Leaving initialization lands in `EventResolving` with discrete states
/// already settled, so `enter_continuous_time_mode` may follow directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelMode {
    Uninitialized,
    Initializing,
    Continuous,
    EventResolving,
    Terminated,
}

/// One loaded model instance plus the state the integration loop mutates.
///
/// The session owns the continuous state vector `x` and the time `t`; they
/// only change together through [`ModelSession::advance`].
pub struct ModelSession<M> {
    model: M,
    mode: ModelMode,
    configured: bool,
    t: f64,
    x: Vec<f64>,
    nominal: Vec<f64>,
    discrete_pending: bool,
    integrator: ForwardEuler,
}

impl ModelSession<LumpedModel> {
    /// Load a lumped model definition from a YAML or JSON file.
    pub fn load(path: &Path) -> ModelResult<Self> {
        Ok(Self::new(LumpedModel::load(path)?))
    }
}

impl<M: ModelExchange> ModelSession<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            mode: ModelMode::Uninitialized,
            configured: false,
            t: 0.0,
            x: Vec::new(),
            nominal: Vec::new(),
            discrete_pending: false,
            integrator: ForwardEuler,
        }
    }

    pub fn mode(&self) -> ModelMode {
        self.mode
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn continuous_states(&self) -> &[f64] {
        &self.x
    }

    pub fn nominal_continuous_states(&self) -> &[f64] {
        &self.nominal
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_inner(self) -> M {
        self.model
    }

    fn require(&self, operation: &'static str, allowed: &[ModelMode]) -> ModelResult<()> {
        if allowed.contains(&self.mode) {
            Ok(())
        } else {
            Err(ModelError::InvalidTransition {
                operation,
                mode: self.mode,
            })
        }
    }

    /// Configure start time and initial values.
    ///
    /// `initial_names` and `initial_values` must have equal length.
    pub fn setup<S: AsRef<str>>(
        &mut self,
        start_time: f64,
        initial_names: &[S],
        initial_values: &[f64],
    ) -> ModelResult<()> {
        self.require("setup", &[ModelMode::Uninitialized])?;
        if initial_names.len() != initial_values.len() {
            return Err(ModelError::Config {
                what: format!(
                    "{} initial names but {} initial values",
                    initial_names.len(),
                    initial_values.len()
                ),
            });
        }
        let start_time = cs_core::ensure_finite(start_time, "start_time")?;
        for (name, value) in initial_names.iter().zip(initial_values) {
            self.model.set_real(name.as_ref(), *value)?;
        }
        self.model.setup_experiment(start_time)?;
        self.t = start_time;
        self.configured = true;
        debug!(
            model = self.model.model_name(),
            start_time,
            initial_values = initial_values.len(),
            "model configured"
        );
        Ok(())
    }

    /// Enter initialization mode.
    ///
    /// The returned scope leaves initialization mode when finished or dropped,
    /// so the bracket is always closed even when the caller bails out early.
    pub fn enter_initialization_mode(&mut self) -> ModelResult<InitializationScope<'_, M>> {
        self.require("enter_initialization_mode", &[ModelMode::Uninitialized])?;
        if !self.configured {
            return Err(ModelError::Config {
                what: "setup must run before initialization".to_string(),
            });
        }
        self.model.enter_initialization_mode()?;
        self.mode = ModelMode::Initializing;
        Ok(InitializationScope {
            session: self,
            closed: false,
        })
    }

    fn exit_initialization_mode(&mut self) -> ModelResult<()> {
        self.require("exit_initialization_mode", &[ModelMode::Initializing])?;
        // The bracket is closed even if the model rejects the exit.
        self.mode = ModelMode::EventResolving;
        self.discrete_pending = false;
        self.model.exit_initialization_mode()?;
        self.x = self.model.continuous_states();
        self.nominal = self.model.nominal_continuous_states();
        Ok(())
    }

    pub fn enter_continuous_time_mode(&mut self) -> ModelResult<()> {
        self.require("enter_continuous_time_mode", &[ModelMode::EventResolving])?;
        if self.discrete_pending {
            return Err(ModelError::InvalidTransition {
                operation: "enter_continuous_time_mode (discrete states unresolved)",
                mode: self.mode,
            });
        }
        self.model.enter_continuous_time_mode()?;
        self.mode = ModelMode::Continuous;
        Ok(())
    }

    /// Enter event mode and mark discrete states as needing resolution.
    pub fn enter_event_mode(&mut self) -> ModelResult<()> {
        self.require("enter_event_mode", &[ModelMode::Continuous])?;
        self.model.enter_event_mode()?;
        self.mode = ModelMode::EventResolving;
        self.discrete_pending = true;
        Ok(())
    }

    /// Run one event iteration.
    pub fn event_update(&mut self) -> ModelResult<EventInfo> {
        self.require("event_update", &[ModelMode::EventResolving])?;
        let info = self.model.event_update()?;
        self.discrete_pending = info.new_discrete_states_needed;
        Ok(info)
    }

    /// Iterate `event_update` until the model needs no further discrete updates.
    pub fn resolve_discrete_states(&mut self, max_iterations: usize) -> ModelResult<EventInfo> {
        let mut iterations = 0;
        while self.discrete_pending {
            if iterations >= max_iterations {
                return Err(ModelError::EventIterationLimit { iterations });
            }
            self.event_update()?;
            iterations += 1;
        }
        Ok(self.model.event_info())
    }

    pub fn event_info(&self) -> EventInfo {
        self.model.event_info()
    }

    pub fn derivatives(&mut self) -> ModelResult<Vec<f64>> {
        self.require("derivatives", &[ModelMode::Continuous])?;
        self.model.derivatives()
    }

    /// Advance one explicit Euler step: `x ← x + h·dx`, `t ← t + h`.
    ///
    /// Time and states are pushed to the model together; if the model rejects
    /// the new states its time is rolled back.
    pub fn advance(&mut self, h: f64, dx: &[f64]) -> ModelResult<()> {
        self.require("advance", &[ModelMode::Continuous])?;
        let x_new = self.integrator.step(&self.x, dx, h)?;
        let t_new = self.t + h;
        self.model.set_time(t_new)?;
        if let Err(e) = self.model.set_continuous_states(&x_new) {
            self.model.set_time(self.t)?;
            return Err(e);
        }
        self.t = t_new;
        self.x = x_new;
        Ok(())
    }

    pub fn event_indicators(&mut self) -> ModelResult<Vec<f64>> {
        self.require(
            "event_indicators",
            &[ModelMode::Continuous, ModelMode::EventResolving],
        )?;
        self.model.event_indicators()
    }

    pub fn completed_integrator_step(&mut self) -> ModelResult<bool> {
        self.require("completed_integrator_step", &[ModelMode::Continuous])?;
        self.model.completed_integrator_step()
    }

    /// Re-read continuous states after an event changed them.
    pub fn refresh_continuous_states(&mut self) {
        self.x = self.model.continuous_states();
    }

    /// Re-read nominal values after an event changed them.
    pub fn refresh_nominals(&mut self) {
        self.nominal = self.model.nominal_continuous_states();
    }

    pub fn get_real(&self, name: &str) -> ModelResult<f64> {
        self.model.get_real(name)
    }

    pub fn set_real(&mut self, name: &str, value: f64) -> ModelResult<()> {
        if self.mode == ModelMode::Terminated {
            return Err(ModelError::InvalidTransition {
                operation: "set_real",
                mode: self.mode,
            });
        }
        let value = cs_core::ensure_finite(value, "set_real value")?;
        self.model.set_real(name, value)
    }

    /// Whether the integration loop must stop.
    pub fn terminate_simulation(&self) -> bool {
        self.mode == ModelMode::Terminated || self.model.event_info().terminate_simulation
    }

    /// Terminate the session. `Terminated` is absorbing.
    pub fn terminate(&mut self) -> ModelResult<()> {
        if self.mode == ModelMode::Terminated {
            return Ok(());
        }
        self.mode = ModelMode::Terminated;
        self.model.terminate()
    }
}

/// Scoped initialization bracket returned by
/// [`ModelSession::enter_initialization_mode`].
pub struct InitializationScope<'a, M: ModelExchange> {
    session: &'a mut ModelSession<M>,
    closed: bool,
}

impl<M: ModelExchange> InitializationScope<'_, M> {
    /// Apply an initial value while in initialization mode.
    pub fn set_real(&mut self, name: &str, value: f64) -> ModelResult<()> {
        self.session.set_real(name, value)
    }

    pub fn get_real(&self, name: &str) -> ModelResult<f64> {
        self.session.get_real(name)
    }

    /// Leave initialization mode, reporting any model error.
    pub fn finish(mut self) -> ModelResult<()> {
        self.closed = true;
        self.session.exit_initialization_mode()
    }
}

impl<M: ModelExchange> Drop for InitializationScope<'_, M> {
    fn drop(&mut self) {
        if !self.closed
            && let Err(e) = self.session.exit_initialization_mode()
        {
            warn!(error = %e, "implicit exit from initialization mode failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ModelDefinition;

    fn decay_model() -> LumpedModel {
        let yaml = r#"
name: decay
states:
  - name: room.T
    start: 300.0
    capacitance: 100.0
inputs:
  - name: ambient.T
    value: 280.0
links:
  - state: room.T
    other: ambient.T
    ua: 10.0
"#;
        let def: ModelDefinition = serde_yaml::from_str(yaml).unwrap();
        LumpedModel::from_definition(def).unwrap()
    }

    fn started(model: LumpedModel) -> ModelSession<LumpedModel> {
        let mut session = ModelSession::new(model);
        session.setup::<&str>(0.0, &[], &[]).unwrap();
        session.enter_initialization_mode().unwrap().finish().unwrap();
        session.enter_continuous_time_mode().unwrap();
        session
    }

    #[test]
    fn setup_rejects_length_mismatch() {
        let mut session = ModelSession::new(decay_model());
        let err = session.setup(0.0, &["room.T"], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.class(), cs_core::FailureClass::Config);
        assert_eq!(session.mode(), ModelMode::Uninitialized);
    }

    #[test]
    fn setup_applies_initial_values() {
        let mut session = ModelSession::new(decay_model());
        session.setup(0.0, &["room.T"], &[310.0]).unwrap();
        assert_eq!(session.get_real("room.T").unwrap(), 310.0);
    }

    #[test]
    fn initialization_scope_closes_on_drop() {
        let mut session = ModelSession::new(decay_model());
        session.setup::<&str>(0.0, &[], &[]).unwrap();
        {
            let mut scope = session.enter_initialization_mode().unwrap();
            scope.set_real("ambient.T", 290.0).unwrap();
            // dropped without finish()
        }
        assert_eq!(session.mode(), ModelMode::EventResolving);
        assert_eq!(session.continuous_states(), &[300.0]);
        session.enter_continuous_time_mode().unwrap();
        assert_eq!(session.mode(), ModelMode::Continuous);
    }

    #[test]
    fn advance_moves_time_and_state_together() {
        let mut session = started(decay_model());
        let dx = session.derivatives().unwrap();
        assert!((dx[0] - (-2.0)).abs() < 1e-12);
        session.advance(0.5, &dx).unwrap();
        assert_eq!(session.time(), 0.5);
        assert!((session.continuous_states()[0] - 299.0).abs() < 1e-12);
        assert!((session.get_real("room.T").unwrap() - 299.0).abs() < 1e-12);
    }

    #[test]
    fn advance_rejects_non_positive_step_without_mutation() {
        let mut session = started(decay_model());
        let dx = session.derivatives().unwrap();
        assert!(session.advance(0.0, &dx).is_err());
        assert_eq!(session.time(), 0.0);
        assert_eq!(session.continuous_states(), &[300.0]);
    }

    #[test]
    fn continuous_mode_requires_settled_discrete_states() {
        let mut session = started(decay_model());
        session.enter_event_mode().unwrap();
        assert!(session.enter_continuous_time_mode().is_err());
        session.resolve_discrete_states(10).unwrap();
        session.enter_continuous_time_mode().unwrap();
    }

    #[test]
    fn integration_calls_rejected_outside_continuous_mode() {
        let mut session = ModelSession::new(decay_model());
        assert!(matches!(
            session.derivatives(),
            Err(ModelError::InvalidTransition { .. })
        ));
        assert!(session.enter_event_mode().is_err());
    }

    #[test]
    fn terminated_is_absorbing() {
        let mut session = started(decay_model());
        session.terminate().unwrap();
        assert!(session.terminate_simulation());
        assert!(session.enter_event_mode().is_err());
        assert!(session.set_real("ambient.T", 1.0).is_err());
        // reading final values is still allowed
        assert_eq!(session.get_real("room.T").unwrap(), 300.0);
    }

    #[test]
    fn unknown_variable_is_classified() {
        let session = started(decay_model());
        let err = session.get_real("nope").unwrap_err();
        assert_eq!(err.class(), cs_core::FailureClass::UnknownVariable);
    }
}
