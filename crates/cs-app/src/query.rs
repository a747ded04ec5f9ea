//! Query helpers for extracting data from stored runs.

use cs_results::TimeseriesRecord;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub record_count: usize,
    pub variables: Vec<String>,
}

pub fn get_run_summary(records: &[TimeseriesRecord]) -> AppResult<RunSummary> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(AppError::InvalidInput("No records in run".to_string()));
    };
    Ok(RunSummary {
        time_range: (first.time_s, last.time_s),
        record_count: records.len(),
        variables: list_variables(records),
    })
}

/// Observable names sampled in a run.
pub fn list_variables(records: &[TimeseriesRecord]) -> Vec<String> {
    records
        .first()
        .map(|r| r.values.keys().cloned().collect())
        .unwrap_or_default()
}

/// `(time, value)` pairs of one observable.
pub fn extract_series(records: &[TimeseriesRecord], variable: &str) -> AppResult<Vec<(f64, f64)>> {
    if !records.iter().any(|r| r.values.contains_key(variable)) {
        return Err(AppError::InvalidInput(format!(
            "Unknown variable: {variable}"
        )));
    }
    Ok(records
        .iter()
        .filter_map(|r| r.values.get(variable).map(|v| (r.time_s, *v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn record(t: f64, room: f64) -> TimeseriesRecord {
        TimeseriesRecord {
            time_s: t,
            values: BTreeMap::from([("room.T".to_string(), room), ("supply.v".to_string(), 0.3)]),
        }
    }

    #[test]
    fn summary_and_series() {
        let records = vec![record(0.0, 293.0), record(1.0, 293.5), record(2.0, 294.0)];
        let summary = get_run_summary(&records).unwrap();
        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.time_range, (0.0, 2.0));
        assert_eq!(summary.variables, vec!["room.T", "supply.v"]);

        let series = extract_series(&records, "room.T").unwrap();
        assert_eq!(series, vec![(0.0, 293.0), (1.0, 293.5), (2.0, 294.0)]);
        assert!(matches!(
            extract_series(&records, "room.X"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_run_has_no_summary() {
        assert!(get_run_summary(&[]).is_err());
    }
}
