use cs_app::{describe_bindings, load_config};

const CONFIG: &str = r#"
version: 1
name: bindings
model: room.yaml
simulation: { t_end: 10.0, dt: 1.0 }
cadence: { type: event_count, every: 3.0 }
exchange:
  model_to_field: "supply.v inlet.v;supply.T inlet.T;floor.T wall-floor.T"
  field_to_model: "RoomT room.Tfluent;fluxes room.Q_;RoomT room.Tfluent"
boundaries:
  - { name: inlet }
  - { name: outlet }
  - { name: wall-floor }
  - { name: wall-front, temperature: 290.0 }
  - { name: wall-ceiling, temperature: 290.0 }
"#;

#[test]
fn bindings_resolve_to_boundaries_and_reports() {
    let dir = std::env::temp_dir().join(format!("cs_app_bindings_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cosim.yaml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = load_config(&path).unwrap();
    let summary = describe_bindings(&config).unwrap();

    assert_eq!(summary.model_to_field.len(), 3);
    assert_eq!(summary.model_to_field[0].resolved, "inlet velocity of inlet");
    assert_eq!(summary.model_to_field[2].resolved, "wall temperature of wall-floor");

    assert_eq!(summary.field_to_model.len(), 3);
    assert_eq!(summary.field_to_model[0].resolved, "volume mass-average");
    assert!(summary.field_to_model[1].resolved.starts_with("room.Q_inlet, room.Q_outlet"));
    assert_eq!(summary.duplicate_destinations, vec!["room.Tfluent"]);

    let _ = std::fs::remove_dir_all(&dir);
}
