//! Persistent run store.
//!
//! ```text
//! <work_root>/.cosim/runs/<run_id>/manifest.json
//! <work_root>/.cosim/runs/<run_id>/timeseries.jsonl
//! ```

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::{RunManifest, TimeseriesRecord};
use crate::{ResultsError, ResultsResult};

const STORE_DIR: &str = ".cosim";
const RUNS_DIR: &str = "runs";
const MANIFEST_FILE: &str = "manifest.json";
const TIMESERIES_FILE: &str = "timeseries.jsonl";

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Store kept under `<work_root>/.cosim/runs`.
    pub fn for_work_root(work_root: &Path) -> ResultsResult<Self> {
        if work_root.as_os_str().is_empty() {
            return Err(ResultsError::InvalidPath {
                message: "work root is empty".to_string(),
            });
        }
        Self::new(work_root.join(STORE_DIR).join(RUNS_DIR))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn entry(&self, run_id: &str, file: &str) -> PathBuf {
        self.root_dir.join(run_id).join(file)
    }

    fn existing_entry(&self, run_id: &str, file: &str) -> ResultsResult<PathBuf> {
        let path = self.entry(run_id, file);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            })
        }
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.entry(run_id, MANIFEST_FILE).is_file()
    }

    /// Write a run's manifest and sampled records, replacing a run with the same id.
    pub fn save_run(&self, manifest: &RunManifest, records: &[TimeseriesRecord]) -> ResultsResult<()> {
        let run_dir = self.root_dir.join(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        fs::write(
            run_dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(manifest)?,
        )?;

        let mut out = BufWriter::new(fs::File::create(run_dir.join(TIMESERIES_FILE))?);
        for record in records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;

        debug!(run_id = %manifest.run_id, records = records.len(), "run stored");
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let path = self.existing_entry(run_id, MANIFEST_FILE)?;
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn load_timeseries(&self, run_id: &str) -> ResultsResult<Vec<TimeseriesRecord>> {
        let path = self.existing_entry(run_id, TIMESERIES_FILE)?;
        let reader = BufReader::new(fs::File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }

    /// Every stored run, newest first. Directories without a readable
    /// manifest are skipped.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs: Vec<RunManifest> = fs::read_dir(&self.root_dir)?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                self.load_manifest(&entry.file_name().to_string_lossy())
                    .ok()
            })
            .collect();
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.root_dir.join(run_id);
        match fs::remove_dir_all(&run_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
