//! Lumped thermal network model built from a [`ModelDefinition`].

use std::collections::HashMap;
use std::path::Path;

use cs_core::EVENT_TIME_TOL;
use tracing::debug;

use crate::definition::ModelDefinition;
use crate::error::{ModelError, ModelResult};
use crate::exchange::{EventInfo, ModelExchange};

const MAX_INIT_ITERATIONS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VarRef {
    State(usize),
    Input(usize),
    Output(usize),
    Switch(usize),
    SwitchOutput(usize),
}

#[derive(Clone, Debug)]
struct Term {
    var: VarRef,
    gain: f64,
}

#[derive(Clone, Debug)]
struct Output {
    offset: f64,
    terms: Vec<Term>,
}

#[derive(Clone, Debug)]
struct Link {
    state: usize,
    other: VarRef,
    ua: f64,
}

#[derive(Clone, Debug)]
struct Gain {
    state: usize,
    source: VarRef,
    gain: f64,
}

#[derive(Clone, Debug)]
struct Schedule {
    input: usize,
    points: Vec<(f64, f64)>,
    cursor: usize,
}

#[derive(Clone, Debug)]
struct Switch {
    monitor: VarRef,
    on_below: f64,
    off_above: f64,
    on_value: f64,
    off_value: f64,
    initially_on: bool,
    on: bool,
}

impl Switch {
    fn threshold(&self) -> f64 {
        if self.on { self.off_above } else { self.on_below }
    }

    /// Apply hysteresis to a monitored value. Returns whether the switch toggled.
    fn update(&mut self, monitored: f64) -> bool {
        if !self.on && monitored < self.on_below {
            self.on = true;
            true
        } else if self.on && monitored > self.off_above {
            self.on = false;
            true
        } else {
            false
        }
    }
}

/// A lumped-parameter thermal network with time and state events.
#[derive(Clone, Debug)]
pub struct LumpedModel {
    name: String,
    names: HashMap<String, VarRef>,
    capacitance: Vec<f64>,
    nominal: Vec<f64>,
    x: Vec<f64>,
    inputs: Vec<f64>,
    outputs: Vec<Output>,
    links: Vec<Link>,
    gains: Vec<Gain>,
    schedules: Vec<Schedule>,
    switches: Vec<Switch>,
    step_events: bool,
    stop_time: Option<f64>,
    t: f64,
    in_event_mode: bool,
    states_written: bool,
    discrete_pending: bool,
}

fn malformed(what: impl Into<String>) -> ModelError {
    ModelError::Definition { what: what.into() }
}

fn finite(v: f64, what: &str) -> ModelResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(malformed(format!("{what} must be finite")))
    }
}

impl LumpedModel {
    /// Load a definition file; `.json` is read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> ModelResult<Self> {
        let load_err = |message: String| ModelError::Load {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let def: ModelDefinition = if is_json {
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| load_err(e.to_string()))?
        };
        Self::from_definition(def).map_err(|e| load_err(e.to_string()))
    }

    /// Validate a definition and resolve every variable reference.
    pub fn from_definition(def: ModelDefinition) -> ModelResult<Self> {
        let mut names: HashMap<String, VarRef> = HashMap::new();
        let mut register = |name: &str, var: VarRef| -> ModelResult<()> {
            if name.trim().is_empty() {
                return Err(malformed("variable names must not be empty"));
            }
            if names.insert(name.to_string(), var).is_some() {
                return Err(malformed(format!("duplicate variable '{name}'")));
            }
            Ok(())
        };

        for (i, s) in def.states.iter().enumerate() {
            register(&s.name, VarRef::State(i))?;
        }
        for (i, input) in def.inputs.iter().enumerate() {
            register(&input.name, VarRef::Input(i))?;
        }
        for (i, o) in def.outputs.iter().enumerate() {
            register(&o.name, VarRef::Output(i))?;
        }
        for (i, sw) in def.switches.iter().enumerate() {
            register(&sw.name, VarRef::Switch(i))?;
            register(&sw.output, VarRef::SwitchOutput(i))?;
        }

        let lookup = |name: &str, context: &str| -> ModelResult<VarRef> {
            names
                .get(name)
                .copied()
                .ok_or_else(|| malformed(format!("{context} references unknown variable '{name}'")))
        };
        let state_index = |name: &str, context: &str| -> ModelResult<usize> {
            match lookup(name, context)? {
                VarRef::State(i) => Ok(i),
                _ => Err(malformed(format!("{context}: '{name}' is not a state"))),
            }
        };

        let mut capacitance = Vec::with_capacity(def.states.len());
        let mut nominal = Vec::with_capacity(def.states.len());
        let mut x = Vec::with_capacity(def.states.len());
        for s in &def.states {
            let c = finite(s.capacitance, "capacitance")?;
            if c <= 0.0 {
                return Err(malformed(format!("state '{}' capacitance must be positive", s.name)));
            }
            let n = finite(s.nominal, "nominal")?;
            if n <= 0.0 {
                return Err(malformed(format!("state '{}' nominal must be positive", s.name)));
            }
            capacitance.push(c);
            nominal.push(n);
            x.push(finite(s.start, "state start")?);
        }

        let inputs = def
            .inputs
            .iter()
            .map(|i| finite(i.value, "input value"))
            .collect::<ModelResult<Vec<_>>>()?;

        let mut outputs = Vec::with_capacity(def.outputs.len());
        for (i, o) in def.outputs.iter().enumerate() {
            let mut terms = Vec::with_capacity(o.terms.len());
            for term in &o.terms {
                let var = lookup(&term.variable, &format!("output '{}'", o.name))?;
                if let VarRef::Output(j) = var
                    && j >= i
                {
                    return Err(malformed(format!(
                        "output '{}' may only reference earlier outputs",
                        o.name
                    )));
                }
                terms.push(Term {
                    var,
                    gain: finite(term.gain, "term gain")?,
                });
            }
            outputs.push(Output {
                offset: finite(o.offset, "output offset")?,
                terms,
            });
        }

        let mut links = Vec::with_capacity(def.links.len());
        for l in &def.links {
            let ua = finite(l.ua, "link ua")?;
            if ua < 0.0 {
                return Err(malformed(format!("link on '{}' has negative ua", l.state)));
            }
            links.push(Link {
                state: state_index(&l.state, "link")?,
                other: lookup(&l.other, "link")?,
                ua,
            });
        }

        let mut gains = Vec::with_capacity(def.gains.len());
        for g in &def.gains {
            gains.push(Gain {
                state: state_index(&g.state, "gain")?,
                source: lookup(&g.source, "gain")?,
                gain: finite(g.gain, "gain")?,
            });
        }

        let mut schedules = Vec::with_capacity(def.schedules.len());
        for s in &def.schedules {
            let input = match lookup(&s.input, "schedule")? {
                VarRef::Input(i) => i,
                _ => return Err(malformed(format!("schedule target '{}' is not an input", s.input))),
            };
            if s.points.is_empty() {
                return Err(malformed(format!("schedule for '{}' has no points", s.input)));
            }
            for pair in s.points.windows(2) {
                if pair[1].0 < pair[0].0 {
                    return Err(malformed(format!(
                        "schedule for '{}' must be in ascending time order",
                        s.input
                    )));
                }
            }
            for (t, v) in &s.points {
                finite(*t, "schedule time")?;
                finite(*v, "schedule value")?;
            }
            schedules.push(Schedule {
                input,
                points: s.points.clone(),
                cursor: 0,
            });
        }

        let mut switches = Vec::with_capacity(def.switches.len());
        for sw in &def.switches {
            let on_below = finite(sw.on_below, "switch on_below")?;
            let off_above = finite(sw.off_above, "switch off_above")?;
            if on_below > off_above {
                return Err(malformed(format!(
                    "switch '{}' needs on_below <= off_above",
                    sw.name
                )));
            }
            switches.push(Switch {
                monitor: lookup(&sw.monitor, &format!("switch '{}'", sw.name))?,
                on_below,
                off_above,
                on_value: finite(sw.on_value, "switch on_value")?,
                off_value: finite(sw.off_value, "switch off_value")?,
                initially_on: sw.initially_on,
                on: sw.initially_on,
            });
        }

        if let Some(stop) = def.stop_time {
            finite(stop, "stop_time")?;
        }

        Ok(Self {
            name: def.name,
            names,
            capacitance,
            nominal,
            x,
            inputs,
            outputs,
            links,
            gains,
            schedules,
            switches,
            step_events: def.step_events,
            stop_time: def.stop_time,
            t: 0.0,
            in_event_mode: false,
            states_written: false,
            discrete_pending: false,
        })
    }

    pub fn state_count(&self) -> usize {
        self.x.len()
    }

    /// Names of every readable variable, sorted.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    fn value(&self, var: VarRef) -> f64 {
        match var {
            VarRef::State(i) => self.x[i],
            VarRef::Input(i) => self.inputs[i],
            VarRef::Output(i) => {
                let out = &self.outputs[i];
                out.offset
                    + out
                        .terms
                        .iter()
                        .map(|t| t.gain * self.value(t.var))
                        .sum::<f64>()
            }
            VarRef::Switch(i) => {
                if self.switches[i].on {
                    1.0
                } else {
                    0.0
                }
            }
            VarRef::SwitchOutput(i) => {
                let sw = &self.switches[i];
                if sw.on { sw.on_value } else { sw.off_value }
            }
        }
    }

    fn resolve(&self, name: &str) -> ModelResult<VarRef> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownVariable {
                name: name.to_string(),
            })
    }

    fn stop_reached(&self) -> bool {
        self.stop_time
            .is_some_and(|stop| self.t >= stop - EVENT_TIME_TOL)
    }

    fn next_event_time(&self) -> Option<f64> {
        let horizon = self.t + EVENT_TIME_TOL;
        let scheduled = self
            .schedules
            .iter()
            .filter_map(|s| s.points[s.cursor..].iter().map(|p| p.0).find(|&t| t > horizon));
        let stop = self.stop_time.filter(|&stop| stop > horizon);
        scheduled.chain(stop).reduce(f64::min)
    }

    /// Apply due schedule points and switch hysteresis once.
    fn update_discrete(&mut self) -> bool {
        let mut changed = false;
        let horizon = self.t + EVENT_TIME_TOL;
        for sched in &mut self.schedules {
            while let Some(&(t, v)) = sched.points.get(sched.cursor) {
                if t > horizon {
                    break;
                }
                self.inputs[sched.input] = v;
                sched.cursor += 1;
                changed = true;
            }
        }
        let monitored: Vec<f64> = self.switches.iter().map(|s| self.value(s.monitor)).collect();
        for (sw, m) in self.switches.iter_mut().zip(monitored) {
            changed |= sw.update(m);
        }
        changed
    }
}

impl ModelExchange for LumpedModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn setup_experiment(&mut self, start_time: f64) -> ModelResult<()> {
        self.t = start_time;
        for sched in &mut self.schedules {
            sched.cursor = 0;
        }
        for sw in &mut self.switches {
            sw.on = sw.initially_on;
        }
        Ok(())
    }

    fn exit_initialization_mode(&mut self) -> ModelResult<()> {
        let mut iterations = 0;
        while self.update_discrete() {
            iterations += 1;
            if iterations >= MAX_INIT_ITERATIONS {
                return Err(ModelError::EventIterationLimit { iterations });
            }
        }
        self.discrete_pending = false;
        self.states_written = false;
        self.in_event_mode = true;
        debug!(model = %self.name, t = self.t, "initialization complete");
        Ok(())
    }

    fn enter_event_mode(&mut self) -> ModelResult<()> {
        self.in_event_mode = true;
        self.discrete_pending = true;
        Ok(())
    }

    fn enter_continuous_time_mode(&mut self) -> ModelResult<()> {
        self.in_event_mode = false;
        self.states_written = false;
        Ok(())
    }

    fn event_update(&mut self) -> ModelResult<EventInfo> {
        self.discrete_pending = self.update_discrete();
        Ok(self.event_info())
    }

    fn event_info(&self) -> EventInfo {
        EventInfo {
            new_discrete_states_needed: self.discrete_pending,
            terminate_simulation: self.stop_reached(),
            values_of_continuous_states_changed: self.states_written,
            next_event_time: self.next_event_time(),
        }
    }

    fn set_time(&mut self, t: f64) -> ModelResult<()> {
        self.t = cs_core::ensure_finite(t, "time")?;
        Ok(())
    }

    fn continuous_states(&self) -> Vec<f64> {
        self.x.clone()
    }

    fn set_continuous_states(&mut self, x: &[f64]) -> ModelResult<()> {
        if x.len() != self.x.len() {
            return Err(ModelError::InvalidArg {
                what: "state vector length mismatch",
            });
        }
        self.x.copy_from_slice(x);
        Ok(())
    }

    fn nominal_continuous_states(&self) -> Vec<f64> {
        self.nominal.clone()
    }

    fn derivatives(&mut self) -> ModelResult<Vec<f64>> {
        let mut dx = vec![0.0; self.x.len()];
        for link in &self.links {
            let q = link.ua * (self.value(link.other) - self.x[link.state]);
            dx[link.state] += q;
            if let VarRef::State(j) = link.other {
                dx[j] -= q;
            }
        }
        for gain in &self.gains {
            dx[gain.state] += gain.gain * self.value(gain.source);
        }
        for (d, c) in dx.iter_mut().zip(&self.capacitance) {
            *d /= c;
        }
        Ok(dx)
    }

    fn event_indicators(&mut self) -> ModelResult<Vec<f64>> {
        Ok(self
            .switches
            .iter()
            .map(|sw| self.value(sw.monitor) - sw.threshold())
            .collect())
    }

    fn completed_integrator_step(&mut self) -> ModelResult<bool> {
        Ok(self.step_events)
    }

    fn get_real(&self, name: &str) -> ModelResult<f64> {
        Ok(self.value(self.resolve(name)?))
    }

    fn set_real(&mut self, name: &str, value: f64) -> ModelResult<()> {
        match self.resolve(name)? {
            VarRef::State(i) => {
                self.x[i] = value;
                if self.in_event_mode {
                    self.states_written = true;
                }
                Ok(())
            }
            VarRef::Input(i) => {
                self.inputs[i] = value;
                Ok(())
            }
            _ => Err(ModelError::ReadOnly {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(yaml: &str) -> LumpedModel {
        let def: ModelDefinition = serde_yaml::from_str(yaml).unwrap();
        LumpedModel::from_definition(def).unwrap()
    }

    fn definition_error(yaml: &str) -> String {
        let def: ModelDefinition = serde_yaml::from_str(yaml).unwrap();
        LumpedModel::from_definition(def).unwrap_err().to_string()
    }

    const TWO_ZONE: &str = r#"
name: two_zone
states:
  - { name: a.T, start: 300.0, capacitance: 10.0 }
  - { name: b.T, start: 280.0, capacitance: 20.0 }
inputs:
  - { name: heater.Q, value: 5.0 }
links:
  - { state: a.T, other: b.T, ua: 1.0 }
gains:
  - { state: b.T, source: heater.Q }
outputs:
  - name: mean.T
    terms: [{ variable: a.T, gain: 0.5 }, { variable: b.T, gain: 0.5 }]
  - name: mean.dT
    offset: -273.15
    terms: [{ variable: mean.T }]
"#;

    #[test]
    fn conductance_acts_on_both_states() {
        let mut m = model(TWO_ZONE);
        let dx = m.derivatives().unwrap();
        // a loses 20 W, b gains 20 W plus 5 W from the heater
        assert!((dx[0] - (-20.0 / 10.0)).abs() < 1e-12);
        assert!((dx[1] - (25.0 / 20.0)).abs() < 1e-12);
    }

    #[test]
    fn outputs_chain_through_earlier_outputs() {
        let m = model(TWO_ZONE);
        assert_eq!(m.get_real("mean.T").unwrap(), 290.0);
        assert!((m.get_real("mean.dT").unwrap() - 16.85).abs() < 1e-9);
    }

    #[test]
    fn outputs_are_read_only() {
        let mut m = model(TWO_ZONE);
        assert!(matches!(
            m.set_real("mean.T", 1.0),
            Err(ModelError::ReadOnly { .. })
        ));
        assert!(matches!(
            m.set_real("missing", 1.0),
            Err(ModelError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn forward_output_reference_is_malformed() {
        let msg = definition_error(
            r#"
name: bad
outputs:
  - { name: first, terms: [{ variable: second }] }
  - { name: second }
"#,
        );
        assert!(msg.contains("earlier outputs"), "{msg}");
    }

    #[test]
    fn duplicate_names_are_malformed() {
        let msg = definition_error(
            r#"
name: bad
states: [{ name: x, start: 1.0, capacitance: 1.0 }]
inputs: [{ name: x }]
"#,
        );
        assert!(msg.contains("duplicate"), "{msg}");
    }

    #[test]
    fn schedule_drives_time_events() {
        let mut m = model(
            r#"
name: sched
inputs: [{ name: supply.T, value: 290.0 }]
schedules:
  - input: supply.T
    points: [[0.0, 291.0], [5.0, 295.0], [8.0, 293.0]]
"#,
        );
        m.setup_experiment(0.0).unwrap();
        m.exit_initialization_mode().unwrap();
        assert_eq!(m.get_real("supply.T").unwrap(), 291.0);
        assert_eq!(m.event_info().next_event_time, Some(5.0));

        m.set_time(5.0).unwrap();
        m.enter_event_mode().unwrap();
        let info = m.event_update().unwrap();
        assert!(info.new_discrete_states_needed);
        let info = m.event_update().unwrap();
        assert!(!info.new_discrete_states_needed);
        assert_eq!(m.get_real("supply.T").unwrap(), 295.0);
        assert_eq!(info.next_event_time, Some(8.0));
    }

    #[test]
    fn switch_hysteresis_flips_indicator_sign() {
        let mut m = model(
            r#"
name: thermostat
states: [{ name: room.T, start: 293.0, capacitance: 1.0 }]
switches:
  - name: heater.on
    monitor: room.T
    on_below: 292.0
    off_above: 294.0
    output: heater.Q
    on_value: 1000.0
"#,
        );
        m.setup_experiment(0.0).unwrap();
        m.exit_initialization_mode().unwrap();
        assert_eq!(m.get_real("heater.on").unwrap(), 0.0);
        let before = m.event_indicators().unwrap();
        assert!(before[0] > 0.0);

        m.set_continuous_states(&[291.5]).unwrap();
        let after = m.event_indicators().unwrap();
        assert!(after[0] < 0.0);

        m.enter_event_mode().unwrap();
        assert!(m.event_update().unwrap().new_discrete_states_needed);
        assert!(!m.event_update().unwrap().new_discrete_states_needed);
        assert_eq!(m.get_real("heater.Q").unwrap(), 1000.0);
        // now monitored against off_above
        assert!(m.event_indicators().unwrap()[0] < 0.0);
    }

    #[test]
    fn writing_a_state_in_event_mode_is_reported() {
        let mut m = model(TWO_ZONE);
        m.setup_experiment(0.0).unwrap();
        m.exit_initialization_mode().unwrap();
        m.enter_continuous_time_mode().unwrap();
        m.set_real("a.T", 301.0).unwrap();
        assert!(!m.event_info().values_of_continuous_states_changed);

        m.enter_event_mode().unwrap();
        m.set_real("a.T", 305.0).unwrap();
        assert!(m.event_info().values_of_continuous_states_changed);
        assert_eq!(m.continuous_states()[0], 305.0);

        m.enter_continuous_time_mode().unwrap();
        assert!(!m.event_info().values_of_continuous_states_changed);
    }

    #[test]
    fn stop_time_requests_termination() {
        let mut m = model("name: stop\nstop_time: 3.0\n");
        m.setup_experiment(0.0).unwrap();
        assert_eq!(m.event_info().next_event_time, Some(3.0));
        assert!(!m.event_info().terminate_simulation);
        m.set_time(3.0).unwrap();
        assert!(m.event_info().terminate_simulation);
        assert_eq!(m.event_info().next_event_time, None);
    }

    #[test]
    fn step_events_flag_is_reported() {
        let mut m = model("name: steps\nstep_events: true\n");
        assert!(m.completed_integrator_step().unwrap());
    }
}
