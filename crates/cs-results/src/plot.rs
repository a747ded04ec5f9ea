//! Summary plot of the sampled observables.

use std::ops::Range;
use std::path::Path;

use plotters::prelude::*;

use crate::{ResultsError, ResultsResult};

const PANEL_WIDTH: u32 = 960;
const PANEL_HEIGHT: u32 = 280;

fn plot_err(e: impl std::fmt::Display) -> ResultsError {
    ResultsError::Plot {
        message: e.to_string(),
    }
}

/// Padded range of the finite values; a flat series gets a unit band.
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let pad = 0.1 * (hi - lo);
    if pad > 0.0 {
        (lo - pad)..(hi + pad)
    } else {
        (lo - 0.5)..(hi + 0.5)
    }
}

/// One stacked panel per observable against time, written as SVG.
pub fn plot_trajectory(
    path: &Path,
    names: &[String],
    times: &[f64],
    samples: &[Vec<f64>],
) -> ResultsResult<()> {
    if names.is_empty() || times.is_empty() {
        return Ok(());
    }
    let t0 = times[0];
    let t1 = times[times.len() - 1];
    let x_range = if t1 > t0 { t0..t1 } else { t0..(t0 + 1.0) };

    let height = PANEL_HEIGHT * names.len() as u32;
    let root = SVGBackend::new(path, (PANEL_WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let panels = root.split_evenly((names.len(), 1));

    for (column, (name, panel)) in names.iter().zip(panels.iter()).enumerate() {
        let series = || {
            times
                .iter()
                .zip(samples)
                .filter_map(move |(t, row)| row.get(column).map(|v| (*t, *v)))
        };
        let y_range = value_range(series().map(|(_, v)| v));

        let mut chart = ChartBuilder::on(panel)
            .caption(name, ("sans-serif", 18.0).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range.clone(), y_range)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc("time [s]")
            .draw()
            .map_err(plot_err)?;
        chart
            .draw_series(LineSeries::new(
                series().filter(|(_, v)| v.is_finite()),
                BLUE.stroke_width(2),
            ))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}
