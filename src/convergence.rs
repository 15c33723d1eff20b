//! Win-rate convergence series for charting.
//!
//! For every sample size `n` in `1..=points` a fresh engine per strategy plays
//! `n` games, giving one independent win-rate sample per size. Each
//! (size, strategy) pair draws from its own derived seed, so the series is the
//! same whatever the worker count.

use serde::Serialize;
use std::thread;

use crate::engine::{simulate, theoretical_win_rate, Strategy};
use crate::error::{SimError, SimResult, MIN_DOORS};
use crate::logging::{self, ProfileScope};
use crate::random::{derive_seed, RngSource};
use crate::trend::{fit_line, LinearFit};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvergencePoint {
    pub trials: u64,
    pub switch_rate: f64,
    pub stay_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceSeries {
    pub doors: u32,
    pub seed: u64,
    pub points: Vec<ConvergencePoint>,
}

/// Fitted trend lines plus the rates theory predicts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesTrends {
    pub switch: LinearFit,
    pub stay: LinearFit,
    pub expected_switch: f64,
    pub expected_stay: f64,
}

impl ConvergenceSeries {
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.trials as f64).collect()
    }

    pub fn rates(&self, strategy: Strategy) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| match strategy {
                Strategy::Switch => p.switch_rate,
                Strategy::Stay => p.stay_rate,
            })
            .collect()
    }

    pub fn trends(&self) -> SimResult<SeriesTrends> {
        let xs = self.xs();
        let switch = fit_line(&xs, &self.rates(Strategy::Switch))?;
        let stay = fit_line(&xs, &self.rates(Strategy::Stay))?;
        logging::log_fit(Strategy::Switch, switch.slope, switch.intercept, xs.len());
        logging::log_fit(Strategy::Stay, stay.slope, stay.intercept, xs.len());
        Ok(SeriesTrends {
            switch,
            stay,
            expected_switch: theoretical_win_rate(self.doors, Strategy::Switch)?,
            expected_stay: theoretical_win_rate(self.doors, Strategy::Stay)?,
        })
    }
}

pub fn convergence_series(
    doors: u32,
    points: usize,
    threads: usize,
    seed: u64,
) -> SimResult<ConvergenceSeries> {
    if doors < MIN_DOORS {
        return Err(SimError::InvalidConfiguration { doors });
    }
    if points == 0 {
        return Err(SimError::InvalidTrialCount("chart_points"));
    }
    let _scope = ProfileScope::with_context(
        "convergence_series",
        &[("points", serde_json::json!(points))],
    );

    let sizes: Vec<u64> = (1..=points as u64).collect();
    let chunk = points.div_ceil(threads.max(1));

    let chunks: Vec<SimResult<Vec<ConvergencePoint>>> = thread::scope(|s| {
        let handles: Vec<_> = sizes
            .chunks(chunk)
            .map(|part| {
                s.spawn(move || {
                    part.iter()
                        .map(|&n| sample_point(doors, n, seed))
                        .collect::<SimResult<Vec<_>>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(i, h)| h.join().unwrap_or(Err(SimError::WorkerPanicked(i))))
            .collect()
    });

    let mut out = Vec::with_capacity(points);
    for part in chunks {
        out.extend(part?);
    }
    logging::log(
        logging::Level::Info,
        logging::Domain::Chart,
        "series_built",
        logging::obj(&[
            ("doors", serde_json::json!(doors)),
            ("points", serde_json::json!(out.len())),
        ]),
    );
    Ok(ConvergenceSeries {
        doors,
        seed,
        points: out,
    })
}

fn sample_point(doors: u32, trials: u64, seed: u64) -> SimResult<ConvergencePoint> {
    let switch = simulate(
        doors,
        Strategy::Switch,
        trials,
        RngSource::seeded(derive_seed(seed, trials * 2)),
    )?;
    let stay = simulate(
        doors,
        Strategy::Stay,
        trials,
        RngSource::seeded(derive_seed(seed, trials * 2 + 1)),
    )?;
    Ok(ConvergencePoint {
        trials,
        switch_rate: switch.win_rate(),
        stay_rate: stay.win_rate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_point_per_size() {
        let series = convergence_series(3, 25, 1, 3).unwrap();
        assert_eq!(series.points.len(), 25);
        for (i, p) in series.points.iter().enumerate() {
            assert_eq!(p.trials, i as u64 + 1);
            assert!((0.0..=1.0).contains(&p.switch_rate));
            assert!((0.0..=1.0).contains(&p.stay_rate));
        }
    }

    #[test]
    fn test_thread_count_does_not_change_series() {
        let one = convergence_series(3, 40, 1, 17).unwrap();
        let many = convergence_series(3, 40, 6, 17).unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(convergence_series(2, 10, 1, 0).is_err());
        assert_eq!(
            convergence_series(3, 0, 1, 0),
            Err(SimError::InvalidTrialCount("chart_points"))
        );
    }

    #[test]
    fn test_trends_near_theory() {
        let series = convergence_series(3, 300, 4, 5).unwrap();
        let trends = series.trends().unwrap();
        let mid = 150.0;
        assert!((trends.switch.at(mid) - 2.0 / 3.0).abs() < 0.05);
        assert!((trends.stay.at(mid) - 1.0 / 3.0).abs() < 0.05);
        assert!((trends.expected_switch - 2.0 / 3.0).abs() < 1e-12);
    }
}
