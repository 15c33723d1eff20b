//! Convergence chart driver.
//!
//! Usage: cargo run --release --bin convergence -- [doors] [points]
//!
//! Builds the win-rate series for sample sizes 1..=points, fits a trend line per
//! strategy and writes `series.csv` + `summary.json` under OUT_DIR/<run_id>/
//! for any plotting tool to render.

use anyhow::{Context, Result};
use std::path::Path;

use montyhall::config::Config;
use montyhall::convergence::convergence_series;
use montyhall::logging::{self, obj, v_str, Domain, Level};
use montyhall::report::{write_run, RunSummary};

fn main() -> Result<()> {
    let result = run();
    if let Err(err) = &result {
        logging::log_failure("convergence", &format!("{:#}", err));
    }
    logging::flush();
    result
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut cfg = Config::from_env();
    if let Some(doors) = args.get(1) {
        cfg.doors = doors
            .parse()
            .with_context(|| format!("doors must be an integer, got {:?}", doors))?;
    }
    if let Some(points) = args.get(2) {
        cfg.chart_points = points
            .parse()
            .with_context(|| format!("points must be an integer, got {:?}", points))?;
    }
    cfg.validate().with_context(|| {
        format!(
            "rejected configuration {}",
            serde_json::to_string(&cfg).unwrap_or_default()
        )
    })?;

    let seed = cfg.resolve_seed();
    let fingerprint = cfg.fingerprint();
    logging::log_startup("convergence", &fingerprint, seed, serde_json::to_value(&cfg)?);

    let series = convergence_series(cfg.doors, cfg.chart_points, cfg.worker_threads(), seed)?;
    let trends = series.trends()?;
    let summary = RunSummary::new(logging::run_id(), &fingerprint, &series, trends);
    let run_dir = write_run(Path::new(&cfg.out_dir), &summary, &series)?;

    logging::log(
        Level::Info,
        Domain::Chart,
        "export_done",
        obj(&[("dir", v_str(&run_dir.to_string_lossy()))]),
    );

    println!("Monty Hall problem with {} doors, {} sample sizes", cfg.doors, cfg.chart_points);
    println!(
        "switching:     trend {:+.6}/trial, intercept {:.4}, final {:.2}%, theory {:.2}%",
        trends.switch.slope,
        trends.switch.intercept,
        summary.final_switch_rate * 100.0,
        trends.expected_switch * 100.0
    );
    println!(
        "not switching: trend {:+.6}/trial, intercept {:.4}, final {:.2}%, theory {:.2}%",
        trends.stay.slope,
        trends.stay.intercept,
        summary.final_stay_rate * 100.0,
        trends.expected_stay * 100.0
    );
    println!("wrote {}", run_dir.display());

    Ok(())
}
