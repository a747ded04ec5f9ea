use std::collections::BTreeMap;

use cs_exchange::{ExchangePayload, FieldValue};
use cs_results::*;

fn manifest(run_id: &str, timestamp: &str, status: RunStatus) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        name: "rooms".to_string(),
        timestamp: timestamp.to_string(),
        run_tag: "3f2a9c1d".to_string(),
        status,
        failure: match status {
            RunStatus::Aborted => Some("ReportParseError: token 'outlet' missing".to_string()),
            RunStatus::Finished => None,
        },
        t_end_s: 10.0,
        dt_s: 1.0,
        t_final_s: 10.0,
        steps: 10,
        events: 0,
        exchanges: 3,
        driver_version: "0.1.0".to_string(),
    }
}

#[test]
fn save_and_load_run() {
    let temp_dir = std::env::temp_dir().join("cs_results_test_roundtrip");
    let _ = std::fs::remove_dir_all(&temp_dir);
    let store = RunStore::for_work_root(&temp_dir).unwrap();
    assert!(store.root_dir().ends_with(".cosim/runs"));

    let m = manifest("run_a", "2026-10-19T08:00:00Z", RunStatus::Finished);
    let records = vec![
        TimeseriesRecord {
            time_s: 1.0,
            values: BTreeMap::from([("room.T".to_string(), 293.4)]),
        },
        TimeseriesRecord {
            time_s: 2.0,
            values: BTreeMap::from([("room.T".to_string(), 293.9)]),
        },
    ];
    store.save_run(&m, &records).unwrap();

    assert!(store.has_run("run_a"));
    assert_eq!(store.load_manifest("run_a").unwrap(), m);
    assert_eq!(store.load_timeseries("run_a").unwrap(), records);

    store.delete_run("run_a").unwrap();
    assert!(!store.has_run("run_a"));
    assert!(matches!(
        store.load_manifest("run_a"),
        Err(ResultsError::RunNotFound { .. })
    ));

    let _ = std::fs::remove_dir_all(&temp_dir);
}

#[test]
fn list_runs_newest_first() {
    let temp_dir = std::env::temp_dir().join("cs_results_test_list");
    let _ = std::fs::remove_dir_all(&temp_dir);
    let store = RunStore::new(temp_dir.clone()).unwrap();

    store
        .save_run(&manifest("old", "2026-10-18T08:00:00Z", RunStatus::Finished), &[])
        .unwrap();
    store
        .save_run(&manifest("new", "2026-10-19T08:00:00Z", RunStatus::Aborted), &[])
        .unwrap();

    let runs = store.list_runs().unwrap();
    let ids: Vec<&str> = runs.iter().map(|r| r.run_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert!(runs[0].failure.as_deref().unwrap().starts_with("ReportParseError"));

    let _ = std::fs::remove_dir_all(&temp_dir);
}

#[test]
fn recorder_keeps_flushed_rows_on_disk() {
    let dir = std::env::temp_dir().join("cs_results_test_recorder");
    let _ = std::fs::remove_dir_all(&dir);

    let mut rec = ResultRecorder::new(
        vec!["room.T".to_string()],
        vec![SeriesSpec {
            report: "RoomT".to_string(),
            boundary: None,
            file: "TV_general.csv".to_string(),
            column: "TValue".to_string(),
        }],
    )
    .with_output_dir(&dir);

    rec.record_sample(1.0, &[293.2]).unwrap();
    rec.record_exchange(
        1.0,
        ExchangePayload::new(),
        ExchangePayload::new(),
        &[("RoomT".to_string(), FieldValue::Scalar(293.25))],
    );
    rec.flush_series().unwrap();

    let path = dir.join("TV_general.csv");
    assert_eq!(csv::read_indexed_series(&path).unwrap(), vec![293.25]);

    rec.record_sample(2.0, &[293.6]).unwrap();
    rec.finish().unwrap();
    assert!(dir.join(recorder::TRAJECTORY_FILE).exists());
    assert!(dir.join(recorder::PLOT_FILE).exists());

    let _ = std::fs::remove_dir_all(&dir);
}
