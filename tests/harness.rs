//! Batch aggregation and chart export through the public API.

use montyhall::batch::run_batches;
use montyhall::config::Config;
use montyhall::convergence::convergence_series;
use montyhall::report::{write_run, RunSummary, SERIES_HEADER};
use montyhall::{simulate, RngSource, Strategy, Tally};

#[test]
fn batch_totals_add_up_for_any_split() {
    for threads in [1, 2, 5, 16] {
        let t = run_batches(3, Strategy::Stay, 10_007, threads, 1).unwrap();
        assert_eq!(t.trials(), 10_007);
    }
}

#[test]
fn batch_sum_matches_manual_merge() {
    let parts: Vec<Tally> = (0..4)
        .map(|i| simulate(3, Strategy::Switch, 250, RngSource::seeded(i)).unwrap())
        .collect();
    let total: Tally = parts.iter().copied().sum();
    assert_eq!(total.trials(), 1_000);
    assert_eq!(total.wins, parts.iter().map(|t| t.wins).sum::<u64>());
}

#[test]
fn parallel_batches_converge() {
    let t = run_batches(3, Strategy::Switch, 200_000, 4, 99).unwrap();
    assert!((t.win_rate() - 2.0 / 3.0).abs() < 0.01);
}

#[test]
fn config_rejects_two_doors_before_running() {
    let cfg = Config {
        doors: 2,
        ..Config::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn chart_export_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        chart_points: 30,
        seed: Some(12),
        threads: 3,
        out_dir: dir.path().to_string_lossy().to_string(),
        ..Config::default()
    };
    let series = convergence_series(cfg.doors, cfg.chart_points, cfg.worker_threads(), 12).unwrap();
    let trends = series.trends().unwrap();
    let summary = RunSummary::new("r-harness", &cfg.fingerprint(), &series, trends);
    let run_dir = write_run(dir.path(), &summary, &series).unwrap();

    let csv = std::fs::read_to_string(run_dir.join("series.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(SERIES_HEADER));
    assert_eq!(lines.count(), 30);
    assert_eq!(summary.points, 30);
    assert_eq!(summary.seed, 12);
}
