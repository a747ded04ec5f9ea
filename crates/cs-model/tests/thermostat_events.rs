//! Integration test: room with a hysteresis heater driven through a ModelSession.
//!
//! State events come from event indicator sign changes; time events come from
//! a supply schedule. The loop mirrors what the co-simulation driver does.

use std::path::PathBuf;

use cs_core::{EVENT_TIME_TOL, FailureClass, sign_changed};
use cs_model::{ModelError, ModelMode, ModelSession};

const THERMOSTAT: &str = r#"
name: thermostat_room
states:
  - { name: room.T, start: 293.0, capacitance: 1000.0 }
inputs:
  - { name: ambient.T, value: 270.0 }
links:
  - { state: room.T, other: ambient.T, ua: 10.0 }
gains:
  - { state: room.T, source: heater.Q }
switches:
  - name: heater.on
    monitor: room.T
    on_below: 292.0
    off_above: 294.0
    output: heater.Q
    on_value: 500.0
"#;

fn write_model(file_name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cs_model_it_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file_name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn heater_cycles_inside_hysteresis_band() {
    let path = write_model("thermostat.yaml", THERMOSTAT);
    let mut session = ModelSession::load(&path).unwrap();
    session.setup(0.0, &[] as &[&str], &[]).unwrap();
    session.enter_initialization_mode().unwrap().finish().unwrap();
    session.enter_continuous_time_mode().unwrap();

    let h = 0.1;
    let mut z = session.event_indicators().unwrap();
    let mut toggles = 0;
    let mut t_min = f64::MAX;
    let mut t_max = f64::MIN;

    while session.time() < 200.0 - EVENT_TIME_TOL {
        let dx = session.derivatives().unwrap();
        session.advance(h, &dx).unwrap();
        let z_new = session.event_indicators().unwrap();
        if sign_changed(&z, &z_new) {
            session.enter_event_mode().unwrap();
            session.resolve_discrete_states(10).unwrap();
            session.enter_continuous_time_mode().unwrap();
            toggles += 1;
            z = session.event_indicators().unwrap();
        } else {
            z = z_new;
        }
        let temp = session.get_real("room.T").unwrap();
        t_min = t_min.min(temp);
        t_max = t_max.max(temp);
    }

    assert!((session.time() - 200.0).abs() < 1e-6);
    assert!(toggles >= 4, "expected repeated switching, got {toggles}");
    // one Euler step of overshoot at most
    assert!(t_min > 291.9, "min {t_min}");
    assert!(t_max < 294.1, "max {t_max}");
}

#[test]
fn schedule_points_arrive_as_time_events() {
    let path = write_model(
        "schedule.json",
        r#"{
            "name": "scheduled_supply",
            "states": [{ "name": "room.T", "start": 290.0, "capacitance": 50.0 }],
            "inputs": [{ "name": "supply.T", "value": 290.0 }],
            "links": [{ "state": "room.T", "other": "supply.T", "ua": 5.0 }],
            "schedules": [{ "input": "supply.T", "points": [[2.5, 300.0], [4.0, 285.0]] }],
            "stop_time": 6.0
        }"#,
    );
    let mut session = ModelSession::load(&path).unwrap();
    session.setup(0.0, &["supply.T"], &[290.0]).unwrap();
    session.enter_initialization_mode().unwrap().finish().unwrap();
    session.enter_continuous_time_mode().unwrap();

    let mut seen = Vec::new();
    while !session.terminate_simulation() {
        let t = session.time();
        let next = session.event_info().next_event_time.unwrap_or(f64::INFINITY);
        let h = (t + 1.0).min(next) - t;
        let dx = session.derivatives().unwrap();
        session.advance(h, &dx).unwrap();
        if (session.time() - next).abs() <= EVENT_TIME_TOL {
            session.enter_event_mode().unwrap();
            session.resolve_discrete_states(10).unwrap();
            session.enter_continuous_time_mode().unwrap();
            seen.push((session.time(), session.get_real("supply.T").unwrap()));
        }
    }

    assert_eq!(seen.len(), 3);
    assert!((seen[0].0 - 2.5).abs() < 1e-9);
    assert_eq!(seen[0].1, 300.0);
    assert!((seen[1].0 - 4.0).abs() < 1e-9);
    assert_eq!(seen[1].1, 285.0);
    assert!((seen[2].0 - 6.0).abs() < 1e-9);

    session.terminate().unwrap();
    assert_eq!(session.mode(), ModelMode::Terminated);
}

#[test]
fn missing_model_file_is_a_load_failure() {
    let err = ModelSession::load(std::path::Path::new("/nonexistent/model.yaml")).err().unwrap();
    assert!(matches!(err, ModelError::Load { .. }));
    assert_eq!(err.class(), FailureClass::Load);
}

#[test]
fn malformed_definition_is_a_load_failure() {
    let path = write_model(
        "broken.yaml",
        "name: broken\nlinks: [{ state: nowhere, other: also_nowhere, ua: 1.0 }]\n",
    );
    let err = ModelSession::load(&path).err().unwrap();
    assert_eq!(err.class(), FailureClass::Load);
    assert!(err.to_string().contains("nowhere"), "{err}");
}
