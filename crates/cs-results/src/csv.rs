//! CSV writers.
//!
//! Series files use the layout pandas produces for a single-column frame:
//! a header with an empty index label, then `index,value` rows.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::ResultsResult;

pub fn write_indexed_series(path: &Path, column: &str, values: &[f64]) -> ResultsResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, ",{column}")?;
    for (index, value) in values.iter().enumerate() {
        writeln!(out, "{index},{value}")?;
    }
    out.flush()?;
    Ok(())
}

/// `time,<name>...` followed by one row per sample.
pub fn write_trajectory(
    path: &Path,
    names: &[String],
    times: &[f64],
    samples: &[Vec<f64>],
) -> ResultsResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "time")?;
    for name in names {
        write!(out, ",{name}")?;
    }
    writeln!(out)?;
    for (t, row) in times.iter().zip(samples) {
        write!(out, "{t}")?;
        for value in row {
            write!(out, ",{value}")?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Values of an indexed series file, in row order.
pub fn read_indexed_series(path: &Path) -> ResultsResult<Vec<f64>> {
    let content = std::fs::read_to_string(path)?;
    let mut values = Vec::new();
    for line in content.lines().skip(1) {
        let Some((_, value)) = line.split_once(',') else {
            continue;
        };
        if let Ok(v) = value.trim().parse() {
            values.push(v);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_has_pandas_layout() {
        let dir = std::env::temp_dir().join(format!("cs_results_csv_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("TV_general.csv");

        write_indexed_series(&path, "TValue", &[293.15, 294.5]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, ",TValue\n0,293.15\n1,294.5\n");
        assert_eq!(read_indexed_series(&path).unwrap(), vec![293.15, 294.5]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn trajectory_rows_follow_names() {
        let dir = std::env::temp_dir().join(format!("cs_results_traj_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("trajectory.csv");

        write_trajectory(
            &path,
            &["room.T".to_string(), "supply.v".to_string()],
            &[0.5, 1.0],
            &[vec![293.0, 0.2], vec![293.5, 0.25]],
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "time,room.T,supply.v\n0.5,293,0.2\n1,293.5,0.25\n");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
