//! Trial batches split across worker threads.
//!
//! Each worker owns its own engine seeded from `derive_seed(seed, batch)`;
//! engines never cross threads. The per-batch tallies are summed afterwards,
//! which is safe because tally addition is commutative and associative.

use std::thread;

use crate::engine::{Strategy, Tally, TrialEngine};
use crate::error::{SimError, SimResult, MIN_DOORS};
use crate::logging::{self, ProfileScope};
use crate::random::{derive_seed, RngSource};

/// Sizes of `batches` near-equal slices of `trials`, largest first.
pub fn split_trials(trials: u64, batches: usize) -> Vec<u64> {
    let batches = batches.max(1) as u64;
    let base = trials / batches;
    let extra = trials % batches;
    (0..batches)
        .map(|i| base + u64::from(i < extra))
        .filter(|&n| n > 0)
        .collect()
}

/// Run `trials` games for `strategy`, split over `threads` workers.
///
/// The result depends only on `(doors, strategy, trials, threads, seed)`.
pub fn run_batches(
    doors: u32,
    strategy: Strategy,
    trials: u64,
    threads: usize,
    seed: u64,
) -> SimResult<Tally> {
    if doors < MIN_DOORS {
        return Err(SimError::InvalidConfiguration { doors });
    }
    if trials == 0 {
        return Err(SimError::InvalidTrialCount("trials"));
    }
    let _scope = ProfileScope::with_context(
        "run_batches",
        &[
            ("strategy", logging::v_str(strategy.as_str())),
            ("trials", serde_json::json!(trials)),
            ("threads", serde_json::json!(threads)),
        ],
    );

    let sizes = split_trials(trials, threads);
    let stream_base = match strategy {
        Strategy::Switch => 0,
        Strategy::Stay => 1 << 32,
    };

    if sizes.len() == 1 {
        return run_one(doors, strategy, sizes[0], derive_seed(seed, stream_base), 0);
    }

    let results: Vec<SimResult<Tally>> = thread::scope(|s| {
        let handles: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(batch, &n)| {
                let batch_seed = derive_seed(seed, stream_base + batch as u64);
                s.spawn(move || run_one(doors, strategy, n, batch_seed, batch))
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(batch, h)| h.join().unwrap_or(Err(SimError::WorkerPanicked(batch))))
            .collect()
    });

    results.into_iter().sum()
}

fn run_one(doors: u32, strategy: Strategy, trials: u64, seed: u64, batch: usize) -> SimResult<Tally> {
    let mut engine = TrialEngine::new(doors, strategy, RngSource::seeded(seed))?;
    let tally = engine.run(trials);
    logging::log_batch(batch, strategy, doors, &tally);
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_trials_even_and_uneven() {
        assert_eq!(split_trials(10, 2), vec![5, 5]);
        assert_eq!(split_trials(10, 3), vec![4, 3, 3]);
        assert_eq!(split_trials(2, 4), vec![1, 1]);
        assert_eq!(split_trials(7, 0), vec![7]);
        for threads in 1..9 {
            assert_eq!(split_trials(1001, threads).iter().sum::<u64>(), 1001);
        }
    }

    #[test]
    fn test_run_batches_preserves_trial_count() {
        for threads in [1, 2, 3, 8] {
            let t = run_batches(3, Strategy::Switch, 1_003, threads, 42).unwrap();
            assert_eq!(t.trials(), 1_003);
        }
    }

    #[test]
    fn test_run_batches_reproducible() {
        let a = run_batches(4, Strategy::Stay, 5_000, 4, 7).unwrap();
        let b = run_batches(4, Strategy::Stay, 5_000, 4, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_run_batches_rejects_bad_input() {
        assert_eq!(
            run_batches(2, Strategy::Stay, 10, 1, 1),
            Err(SimError::InvalidConfiguration { doors: 2 })
        );
        assert!(run_batches(3, Strategy::Stay, 0, 1, 1).is_err());
    }
}
