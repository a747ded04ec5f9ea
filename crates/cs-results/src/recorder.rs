//! Append-only recording of a co-simulation run.
//!
//! The recorder keeps two kinds of series: the observables sampled after
//! every accepted model step, and report values captured at every exchange.
//! Exchange series are rewritten to disk after each exchange so that rows
//! recorded before an abort survive it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cs_exchange::{ExchangePayload, FieldValue};
use tracing::{debug, info};

use crate::types::TimeseriesRecord;
use crate::{ResultsError, ResultsResult, csv, plot};

pub const TRAJECTORY_FILE: &str = "trajectory.csv";
pub const PLOT_FILE: &str = "FMU_result.svg";

/// One exchanged series written to its own CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    /// Report the value is taken from.
    pub report: String,
    /// Entry of a per-boundary report.
    pub boundary: Option<String>,
    pub file: String,
    pub column: String,
}

impl SeriesSpec {
    /// Pick this series' value out of one report result.
    fn select(&self, value: &FieldValue) -> Option<f64> {
        match (value, &self.boundary) {
            (FieldValue::Scalar(v), None) => Some(*v),
            (FieldValue::PerBoundary(entries), Some(boundary)) => entries
                .iter()
                .find(|(name, _)| name == boundary)
                .map(|(_, v)| *v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRecord {
    pub time_s: f64,
    pub sent: ExchangePayload,
    pub received: ExchangePayload,
}

#[derive(Debug)]
pub struct ResultRecorder {
    observables: Vec<String>,
    times: Vec<f64>,
    samples: Vec<Vec<f64>>,
    specs: Vec<SeriesSpec>,
    series: Vec<Vec<f64>>,
    exchanges: Vec<ExchangeRecord>,
    output_dir: Option<PathBuf>,
}

impl ResultRecorder {
    pub fn new(observables: Vec<String>, specs: Vec<SeriesSpec>) -> Self {
        let series = vec![Vec::new(); specs.len()];
        Self {
            observables,
            times: Vec::new(),
            samples: Vec::new(),
            specs,
            series,
            exchanges: Vec::new(),
            output_dir: None,
        }
    }

    /// Write files below `dir`. Without one the recorder stays in memory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn observables(&self) -> &[String] {
        &self.observables
    }

    /// Reports that must be queried at every exchange to fill the series.
    pub fn series_reports(&self) -> Vec<&str> {
        let mut reports: Vec<&str> = Vec::new();
        for spec in &self.specs {
            if !reports.contains(&spec.report.as_str()) {
                reports.push(&spec.report);
            }
        }
        reports
    }

    pub fn record_sample(&mut self, time_s: f64, values: &[f64]) -> ResultsResult<()> {
        if values.len() != self.observables.len() {
            return Err(ResultsError::SampleWidth {
                expected: self.observables.len(),
                got: values.len(),
            });
        }
        self.times.push(time_s);
        self.samples.push(values.to_vec());
        Ok(())
    }

    /// Append one exchange. `reports` holds the `(report, value)` results
    /// queried during the exchange; series whose report or boundary is
    /// absent get no row.
    pub fn record_exchange(
        &mut self,
        time_s: f64,
        sent: ExchangePayload,
        received: ExchangePayload,
        reports: &[(String, FieldValue)],
    ) {
        for (spec, rows) in self.specs.iter().zip(self.series.iter_mut()) {
            let value = reports
                .iter()
                .find(|(name, _)| *name == spec.report)
                .and_then(|(_, value)| spec.select(value));
            match value {
                Some(v) => rows.push(v),
                None => debug!(file = %spec.file, report = %spec.report, "no value for series"),
            }
        }
        self.exchanges.push(ExchangeRecord {
            time_s,
            sent,
            received,
        });
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }

    pub fn exchanges(&self) -> &[ExchangeRecord] {
        &self.exchanges
    }

    /// Rows of the series written to `file`.
    pub fn series(&self, file: &str) -> Option<&[f64]> {
        self.specs
            .iter()
            .position(|s| s.file == file)
            .map(|i| self.series[i].as_slice())
    }

    /// Last sampled value of an observable.
    pub fn last(&self, name: &str) -> Option<f64> {
        let column = self.observables.iter().position(|o| o == name)?;
        self.samples.last().and_then(|row| row.get(column).copied())
    }

    /// Rewrite every exchange series file.
    pub fn flush_series(&self) -> ResultsResult<()> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        for (spec, rows) in self.specs.iter().zip(&self.series) {
            csv::write_indexed_series(&dir.join(&spec.file), &spec.column, rows)?;
        }
        Ok(())
    }

    /// Write the series, the trajectory and the summary plot.
    pub fn finish(&self) -> ResultsResult<()> {
        self.flush_series()?;
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };
        csv::write_trajectory(
            &dir.join(TRAJECTORY_FILE),
            &self.observables,
            &self.times,
            &self.samples,
        )?;
        plot::plot_trajectory(
            &dir.join(PLOT_FILE),
            &self.observables,
            &self.times,
            &self.samples,
        )?;
        info!(
            dir = %dir.display(),
            samples = self.times.len(),
            exchanges = self.exchanges.len(),
            "results written"
        );
        Ok(())
    }

    /// Samples as store records, one per accepted step.
    pub fn timeseries_records(&self) -> Vec<TimeseriesRecord> {
        self.times
            .iter()
            .zip(&self.samples)
            .map(|(t, row)| TimeseriesRecord {
                time_s: *t,
                values: self
                    .observables
                    .iter()
                    .cloned()
                    .zip(row.iter().copied())
                    .collect::<BTreeMap<_, _>>(),
            })
            .collect()
    }
}
