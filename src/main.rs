//! Win percentages for both strategies.
//!
//! Usage: montyhall [doors] [trials]
//!
//! Env: DOORS, TRIALS, SWITCH, SEED, THREADS, LOG_LEVEL (see config.rs).

use anyhow::{Context, Result};

use montyhall::batch::run_batches;
use montyhall::config::Config;
use montyhall::logging;
use montyhall::theoretical_win_rate;

fn main() -> Result<()> {
    let result = run();
    if let Err(err) = &result {
        logging::log_failure("montyhall", &format!("{:#}", err));
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
    if let Some(trials) = args.get(2) {
        cfg.trials = trials
            .parse()
            .with_context(|| format!("trials must be an integer, got {:?}", trials))?;
    }
    cfg.validate().with_context(|| {
        format!(
            "rejected configuration {}",
            serde_json::to_string(&cfg).unwrap_or_default()
        )
    })?;

    let seed = cfg.resolve_seed();
    logging::log_startup(
        "montyhall",
        &cfg.fingerprint(),
        seed,
        serde_json::to_value(&cfg)?,
    );

    let threads = cfg.worker_threads();
    for strategy in cfg.strategies() {
        let tally = run_batches(cfg.doors, strategy, cfg.trials, threads, seed)?;
        logging::log_tally(
            strategy,
            cfg.doors,
            &tally,
            theoretical_win_rate(cfg.doors, strategy)?,
        );
        println!(
            "Win percentage with {} doors and {}: {:.2}%",
            cfg.doors,
            strategy.describe(),
            tally.win_rate() * 100.0
        );
    }

    Ok(())
}
