//! On-disk export of a convergence run for external plotting.
//!
//! Layout: `<out_dir>/<run_id>/series.csv` and `<out_dir>/<run_id>/summary.json`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::convergence::{ConvergenceSeries, SeriesTrends};
use crate::logging::ts_now;

pub const SERIES_HEADER: &str = "trials,switch_rate,stay_rate,switch_trend,stay_trend";

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub ts: String,
    pub config_hash: String,
    pub doors: u32,
    pub seed: u64,
    pub points: usize,
    pub trends: SeriesTrends,
    pub final_switch_rate: f64,
    pub final_stay_rate: f64,
}

impl RunSummary {
    pub fn new(run_id: &str, config_hash: &str, series: &ConvergenceSeries, trends: SeriesTrends) -> Self {
        let last = series.points.last();
        Self {
            run_id: run_id.to_string(),
            ts: ts_now(),
            config_hash: config_hash.to_string(),
            doors: series.doors,
            seed: series.seed,
            points: series.points.len(),
            trends,
            final_switch_rate: last.map(|p| p.switch_rate).unwrap_or(0.0),
            final_stay_rate: last.map(|p| p.stay_rate).unwrap_or(0.0),
        }
    }
}

/// CSV rows with the fitted line evaluated at each sample size.
pub fn write_series_csv<W: Write>(mut w: W, series: &ConvergenceSeries, trends: &SeriesTrends) -> Result<()> {
    writeln!(w, "{}", SERIES_HEADER)?;
    for p in &series.points {
        let x = p.trials as f64;
        writeln!(
            w,
            "{},{:.6},{:.6},{:.6},{:.6}",
            p.trials,
            p.switch_rate,
            p.stay_rate,
            trends.switch.at(x),
            trends.stay.at(x)
        )?;
    }
    Ok(())
}

/// Write both files into a fresh run directory and return its path.
pub fn write_run(
    out_dir: &Path,
    summary: &RunSummary,
    series: &ConvergenceSeries,
) -> Result<PathBuf> {
    let run_dir = out_dir.join(&summary.run_id);
    create_dir_all(&run_dir)
        .with_context(|| format!("failed to create {}", run_dir.display()))?;

    let csv_path = run_dir.join("series.csv");
    let csv = File::create(&csv_path)
        .with_context(|| format!("failed to create {}", csv_path.display()))?;
    let mut csv = BufWriter::new(csv);
    write_series_csv(&mut csv, series, &summary.trends)?;
    csv.flush()?;

    let summary_path = run_dir.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(summary)?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;

    Ok(run_dir)
}
