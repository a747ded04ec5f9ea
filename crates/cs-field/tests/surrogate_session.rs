//! Integration test: a full field session against the well-mixed surrogate.

use std::path::PathBuf;

use cs_exchange::{ExchangePayload, FieldValue};
use cs_field::{
    BoundaryKind, BoundarySpec, FieldSolverSession, PressureMode, ReportQuery, WellMixedConsole,
    WellMixedParams,
};

fn work_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cs_field_it_{}_{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn room_session(name: &str, mode: PressureMode) -> FieldSolverSession<WellMixedConsole> {
    let params = WellMixedParams {
        zone: "cell-fuild".to_string(),
        ..WellMixedParams::default()
    };
    FieldSolverSession::new(
        WellMixedConsole::new(params, work_dir(name)),
        mode,
        vec![
            BoundarySpec::new("inlet", BoundaryKind::Inlet),
            BoundarySpec::new("outlet", BoundaryKind::Outlet),
            BoundarySpec::new("wall-floor", BoundaryKind::Wall),
            BoundarySpec::new("wall-front", BoundaryKind::Wall).with_temperature(289.0),
        ],
    )
    .with_run_tag("it")
}

#[test]
fn exchange_cycle_produces_all_four_reports() {
    let mut session = room_session("cycle", PressureMode::Normal);
    let case = session.working_dir().join("room.msh");
    std::fs::write(&case, "mesh").unwrap();
    let check = session.read_case(&case).unwrap();
    assert!(std::fs::read_to_string(check).unwrap().contains("cell-fuild"));

    let mut payload = ExchangePayload::new();
    payload.insert("inlet.v", 0.4);
    payload.insert("inlet.T", 299.0);
    payload.insert("wall-floor.T", 293.0);
    session.apply_boundaries(&payload).unwrap();
    session.initialize_fields().unwrap();
    session.solve(100).unwrap();

    let temperature = ReportQuery::VolumeMassAverage {
        zone: "cell-fuild".into(),
        quantity: "temperature".into(),
    };
    let FieldValue::Scalar(t_room) = session.query(&temperature).unwrap() else {
        panic!("expected scalar");
    };
    assert!(t_room > 289.0 && t_room < 299.0, "{t_room}");

    let mass_flow = ReportQuery::SurfaceMassFlow {
        surface: "outlet*".into(),
    };
    let m = session.query_scalar(&mass_flow, "outlet").unwrap();
    assert!((m + 1.2 * 0.4 * 0.04).abs() < 1e-9, "{m}");

    let pressure = ReportQuery::AreaWeightedAverage {
        surface: "inlet".into(),
        quantity: "pressure".into(),
    };
    assert!(matches!(session.query(&pressure).unwrap(), FieldValue::Scalar(p) if p > 0.0));

    let fluxes = ReportQuery::HeatTransfer {
        boundaries: vec!["inlet".into(), "wall-floor".into(), "wall-front".into()],
    };
    let FieldValue::PerBoundary(values) = session.query(&fluxes).unwrap() else {
        panic!("expected per-boundary values");
    };
    assert_eq!(values.len(), 3);
    assert!(values[0].1 > 0.0, "supply air is warmer than the room");

    assert!(session.working_dir().join("simuT_it_1.txt").exists());
}

#[test]
fn snapshot_moves_to_room_directory() {
    let mut session = room_session("snapshot", PressureMode::Negative);
    let mut payload = ExchangePayload::new();
    payload.insert("inlet.T", 296.0);
    payload.insert("outlet.m_flow", 0.02);
    payload.insert("wall-floor.T", 291.0);
    session.apply_boundaries(&payload).unwrap();
    session.initialize_fields().unwrap();
    session.solve(10).unwrap();

    let room = session.working_dir().join("room1");
    session
        .export_case_and_data(&room.join("test.cas"), &room.join("test.dat"))
        .unwrap();
    assert!(room.join("test.cas").exists());
    assert!(room.join("test.dat").exists());
    assert!(!session.working_dir().join("checkpoint.cas").exists());
}

#[test]
fn missing_boundary_value_fails_the_exchange() {
    let mut session = room_session("missing", PressureMode::Negative);
    let mut payload = ExchangePayload::new();
    payload.insert("inlet.T", 296.0);
    payload.insert("wall-floor.T", 291.0);
    let err = session.apply_boundaries(&payload).unwrap_err();
    assert!(err.to_string().contains("outlet"), "{err}");
    assert!(session.status().starts_with("Set Error"));
}
