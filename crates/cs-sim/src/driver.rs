//! Co-simulation driver: the fixed-step integration loop with event
//! handling and periodic exchanges with the field solver.

use std::collections::BTreeMap;

use cs_core::{EVENT_TIME_TOL, FailureClass, Timer, sign_changed};
use cs_exchange::{FieldValue, VariableExchangeMap};
use cs_field::{FieldError, FieldSolverSession, ReportQuery, SolverConsole};
use cs_model::{ModelExchange, ModelSession};
use cs_results::ResultRecorder;
use tracing::{debug, info, warn};

use crate::cadence::{CadencePolicy, CommunicationCounter};
use crate::error::{SimError, SimResult};
use crate::progress::{DriverPhase, DriverProgress};

/// Options for one co-simulation run.
#[derive(Clone, Debug)]
pub struct DriverOptions {
    /// Start time (seconds)
    pub t_start: f64,
    /// Final simulation time (seconds)
    pub t_end: f64,
    /// Fixed step (seconds); steps are shortened to land on event times
    pub dt: f64,
    /// Field-solver iterations per exchange
    pub solve_iterations: usize,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Maximum event iterations per event
    pub max_event_iterations: usize,
    pub cadence: CadencePolicy,
    pub initial_names: Vec<String>,
    pub initial_values: Vec<f64>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 10.0,
            dt: 1.0,
            solve_iterations: 100,
            max_steps: 10_000_000,
            max_event_iterations: 100,
            cadence: CadencePolicy::EventCount {
                every: 3.0,
                increment: 0.001,
            },
            initial_names: Vec::new(),
            initial_values: Vec::new(),
        }
    }
}

impl DriverOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !self.t_start.is_finite() {
            return Err(SimError::InvalidArg {
                what: "t_start must be finite",
            });
        }
        if !(self.t_end.is_finite() && self.t_end > self.t_start) {
            return Err(SimError::InvalidArg {
                what: "t_end must be after t_start",
            });
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if self.solve_iterations == 0 {
            return Err(SimError::InvalidArg {
                what: "solve_iterations must be positive",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.max_event_iterations == 0 {
            return Err(SimError::InvalidArg {
                what: "max_event_iterations must be positive",
            });
        }
        if self.initial_names.len() != self.initial_values.len() {
            return Err(SimError::Config {
                what: format!(
                    "{} initial names but {} initial values",
                    self.initial_names.len(),
                    self.initial_values.len()
                ),
            });
        }
        self.cadence.validate()
    }
}

/// What is exchanged: the binding map and the reports its field-side
/// sources name.
#[derive(Clone, Debug, Default)]
pub struct ExchangePlan {
    pub map: VariableExchangeMap,
    pub reports: BTreeMap<String, ReportQuery>,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    pub phase: DriverPhase,
    /// `"Finished"` or `"<Class>: <message>"`.
    pub status: String,
    pub failure: Option<FailureClass>,
    pub t_final: f64,
    pub steps: usize,
    pub events: usize,
    pub exchanges: usize,
    pub wall_time_s: f64,
}

impl RunOutcome {
    pub fn is_finished(&self) -> bool {
        self.phase == DriverPhase::Finished
    }
}

/// Why the loop stopped early.
enum Halt {
    /// A failed exchange. Ends the run as `Aborted` with a status string.
    Exchange(SimError),
    /// Anything else; returned to the caller.
    Fatal(SimError),
}

impl From<SimError> for Halt {
    fn from(e: SimError) -> Self {
        Halt::Fatal(e)
    }
}

impl From<cs_model::ModelError> for Halt {
    fn from(e: cs_model::ModelError) -> Self {
        Halt::Fatal(e.into())
    }
}

pub struct CoSimulationDriver<M, C> {
    model: ModelSession<M>,
    field: FieldSolverSession<C>,
    plan: ExchangePlan,
    recorder: ResultRecorder,
    options: DriverOptions,
    counter: CommunicationCounter,
    phase: DriverPhase,
    indicators: Vec<f64>,
    t_next: f64,
    steps: usize,
    events: usize,
    exchanges: usize,
}

impl<M: ModelExchange, C: SolverConsole> CoSimulationDriver<M, C> {
    pub fn new(
        model: ModelSession<M>,
        field: FieldSolverSession<C>,
        plan: ExchangePlan,
        recorder: ResultRecorder,
        options: DriverOptions,
    ) -> SimResult<Self> {
        options.validate()?;
        for binding in plan.map.field_to_model() {
            if !plan.reports.contains_key(&binding.source) {
                return Err(SimError::Config {
                    what: format!("field->model source '{}' is not a known report", binding.source),
                });
            }
        }
        let counter = CommunicationCounter::new(options.cadence, options.t_start);
        let t_next = options.t_end;
        Ok(Self {
            model,
            field,
            plan,
            recorder,
            options,
            counter,
            phase: DriverPhase::Idle,
            indicators: Vec::new(),
            t_next,
            steps: 0,
            events: 0,
            exchanges: 0,
        })
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    pub fn model(&self) -> &ModelSession<M> {
        &self.model
    }

    pub fn field(&self) -> &FieldSolverSession<C> {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut FieldSolverSession<C> {
        &mut self.field
    }

    pub fn recorder(&self) -> &ResultRecorder {
        &self.recorder
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Next time the loop will stop at.
    pub fn t_next(&self) -> f64 {
        self.t_next
    }

    pub fn into_parts(self) -> (ModelSession<M>, FieldSolverSession<C>, ResultRecorder) {
        (self.model, self.field, self.recorder)
    }

    pub fn run(&mut self) -> SimResult<RunOutcome> {
        self.run_with_progress(None)
    }

    /// Run to completion.
    ///
    /// Configuration and model-side failures return `Err`. A failed
    /// exchange returns `Ok` with phase `Aborted` and the status string;
    /// results recorded up to that point are written either way.
    pub fn run_with_progress(
        &mut self,
        mut progress: Option<&mut dyn FnMut(&DriverProgress)>,
    ) -> SimResult<RunOutcome> {
        if self.phase != DriverPhase::Idle {
            return Err(SimError::InvalidArg {
                what: "driver has already run",
            });
        }
        let timer = Timer::start("cosim");

        if let Err(e) = self.initialize() {
            self.phase = DriverPhase::Aborted;
            return Err(e);
        }

        match self.integrate(&mut progress) {
            Ok(()) => {
                self.phase = DriverPhase::Finished;
                self.recorder.finish()?;
                self.model.terminate()?;
                let outcome = self.outcome("Finished".to_string(), None, timer.stop());
                info!(
                    t = outcome.t_final,
                    steps = outcome.steps,
                    events = outcome.events,
                    exchanges = outcome.exchanges,
                    wall_time_s = outcome.wall_time_s,
                    "co-simulation finished"
                );
                self.emit(&mut progress);
                Ok(outcome)
            }
            Err(Halt::Exchange(e)) => {
                let class = e.class();
                let status = class.status(&e);
                warn!(t = self.model.time(), %status, "exchange failed, run aborted");
                self.phase = DriverPhase::Aborted;
                if let Err(fe) = self.recorder.finish() {
                    warn!(error = %fe, "could not write results of aborted run");
                }
                if let Err(te) = self.model.terminate() {
                    warn!(error = %te, "model termination failed");
                }
                self.emit(&mut progress);
                Ok(self.outcome(status, Some(class), timer.stop()))
            }
            Err(Halt::Fatal(e)) => {
                self.phase = DriverPhase::Aborted;
                if let Err(fe) = self.recorder.flush_series() {
                    warn!(error = %fe, "could not flush exchange series");
                }
                if let Err(te) = self.model.terminate() {
                    warn!(error = %te, "model termination failed");
                }
                self.emit(&mut progress);
                Err(e)
            }
        }
    }

    fn outcome(&self, status: String, failure: Option<FailureClass>, wall_time_s: f64) -> RunOutcome {
        RunOutcome {
            phase: self.phase,
            status,
            failure,
            t_final: self.model.time(),
            steps: self.steps,
            events: self.events,
            exchanges: self.exchanges,
            wall_time_s,
        }
    }

    fn initialize(&mut self) -> SimResult<()> {
        self.phase = DriverPhase::Initializing;
        let opts = &self.options;
        self.model.setup(
            opts.t_start,
            opts.initial_names.as_slice(),
            &opts.initial_values,
        )?;
        self.model.enter_initialization_mode()?.finish()?;
        // one event iteration settles discrete states at t_start
        self.model.event_update()?;
        self.model
            .resolve_discrete_states(self.options.max_event_iterations)?;
        self.model.enter_continuous_time_mode()?;
        self.indicators = self.model.event_indicators()?;
        self.counter = CommunicationCounter::new(self.options.cadence, self.options.t_start);
        self.t_next = self.next_stop();
        self.record_sample()?;
        info!(
            t_start = self.options.t_start,
            t_end = self.options.t_end,
            dt = self.options.dt,
            cadence = ?self.options.cadence,
            indicators = self.indicators.len(),
            "co-simulation initialized"
        );
        Ok(())
    }

    /// Earliest of the model's next time event, the next communication
    /// instant and `t_end`. Candidates not after the current time are ignored.
    fn next_stop(&self) -> f64 {
        let t = self.model.time();
        let candidates = [
            self.model.event_info().next_event_time,
            self.counter.next_comm_time(),
        ];
        candidates
            .into_iter()
            .flatten()
            .filter(|&c| c > t + EVENT_TIME_TOL)
            .fold(self.options.t_end, f64::min)
    }

    fn integrate(&mut self, progress: &mut Option<&mut dyn FnMut(&DriverProgress)>) -> Result<(), Halt> {
        self.phase = DriverPhase::Integrating;
        let t_end = self.options.t_end;

        while self.model.time() < t_end - EVENT_TIME_TOL && !self.model.terminate_simulation() {
            if self.steps >= self.options.max_steps {
                return Err(SimError::StepLimit {
                    steps: self.steps,
                    t: self.model.time(),
                }
                .into());
            }

            let t_before = self.model.time();
            let dx = self.model.derivatives()?;
            let h = self.options.dt.min(self.t_next - t_before);
            if !(h > 0.0) {
                return Err(SimError::ZeroStep {
                    t: t_before,
                    t_next: self.t_next,
                }
                .into());
            }
            self.model.advance(h, &dx)?;
            self.steps += 1;
            let t = self.model.time();

            let indicators = self.model.event_indicators()?;
            let step_event = self.model.completed_integrator_step()?;
            let time_event = (t - self.t_next).abs() <= EVENT_TIME_TOL;
            let state_event = sign_changed(&self.indicators, &indicators);

            if step_event || time_event || state_event {
                debug!(t, step_event, time_event, state_event, "event");
                self.handle_event(t)?;
            }
            self.indicators = indicators;
            self.t_next = self.next_stop();

            self.record_sample()?;
            self.emit(progress);
        }
        Ok(())
    }

    fn handle_event(&mut self, t: f64) -> Result<(), Halt> {
        self.events += 1;
        self.phase = DriverPhase::EventHandling;
        self.model.enter_event_mode()?;

        if self.counter.is_due(t) {
            self.phase = DriverPhase::Exchanging;
            self.exchange(t).map_err(Halt::Exchange)?;
            self.counter.reset(t);
            self.phase = DriverPhase::EventHandling;
        }
        self.counter.record_event();

        let info = self
            .model
            .resolve_discrete_states(self.options.max_event_iterations)?;
        if info.values_of_continuous_states_changed {
            self.model.refresh_continuous_states();
            self.model.refresh_nominals();
        }
        self.model.enter_continuous_time_mode()?;
        self.phase = DriverPhase::Integrating;
        Ok(())
    }

    /// One synchronous hand-off: model → field, solve, field → model.
    fn exchange(&mut self, t: f64) -> SimResult<()> {
        let timer = Timer::start("exchange");

        let model = &self.model;
        let sent = self
            .plan
            .map
            .resolve_model_to_field(|name| model.get_real(name))?;
        self.field.apply_boundaries(&sent)?;
        if !self.field.is_initialized() {
            self.field.initialize_fields()?;
        }
        self.field.solve(self.options.solve_iterations)?;

        let mut captured: Vec<(String, FieldValue)> = Vec::new();
        let field = &mut self.field;
        let reports = &self.plan.reports;
        let received = self.plan.map.resolve_field_to_model(|source| {
            let query = reports.get(source).ok_or_else(|| FieldError::UnknownReport {
                name: source.to_string(),
            })?;
            let value = field.query(query)?;
            captured.push((source.to_string(), value.clone()));
            Ok::<_, FieldError>(value)
        })?;

        for name in self.recorder.series_reports() {
            if captured.iter().any(|(n, _)| n == name) {
                continue;
            }
            if let Some(query) = self.plan.reports.get(name) {
                captured.push((name.to_string(), self.field.query(query)?));
            }
        }

        for (name, value) in received.iter() {
            self.model.set_real(name, value)?;
        }

        self.exchanges += 1;
        info!(
            t,
            exchange = self.exchanges,
            sent = sent.len(),
            received = received.len(),
            elapsed_s = timer.stop(),
            "exchange complete"
        );
        self.recorder.record_exchange(t, sent, received, &captured);
        self.recorder.flush_series()?;
        Ok(())
    }

    fn record_sample(&mut self) -> SimResult<()> {
        let values = self
            .recorder
            .observables()
            .iter()
            .map(|name| self.model.get_real(name))
            .collect::<Result<Vec<_>, _>>()?;
        self.recorder.record_sample(self.model.time(), &values)?;
        Ok(())
    }

    fn emit(&self, progress: &mut Option<&mut dyn FnMut(&DriverProgress)>) {
        let Some(cb) = progress.as_deref_mut() else {
            return;
        };
        let span = self.options.t_end - self.options.t_start;
        let t = self.model.time();
        cb(&DriverProgress {
            phase: self.phase,
            t,
            t_end: self.options.t_end,
            fraction: ((t - self.options.t_start) / span).clamp(0.0, 1.0),
            step: self.steps,
            events: self.events,
            exchanges: self.exchanges,
        });
    }
}
