use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::engine::Strategy;
use crate::error::{SimError, SimResult, MIN_DOORS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub doors: u32,
    pub trials: u64,
    /// `None` runs both strategies.
    pub switch: Option<bool>,
    pub seed: Option<u64>,
    /// Worker threads for batch runs; 0 means one per CPU.
    pub threads: usize,
    pub chart_points: usize,
    pub out_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            doors: 3,
            trials: 1000,
            switch: None,
            seed: None,
            threads: 1,
            chart_points: 400,
            out_dir: "out/convergence".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            doors: std::env::var("DOORS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.doors),
            trials: std::env::var("TRIALS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.trials),
            switch: std::env::var("SWITCH").ok().and_then(|v| parse_flag(&v)),
            seed: std::env::var("SEED").ok().and_then(|v| v.parse().ok()),
            threads: std::env::var("THREADS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.threads),
            chart_points: std::env::var("CHART_POINTS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.chart_points),
            out_dir: std::env::var("OUT_DIR").unwrap_or(d.out_dir),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.doors < MIN_DOORS {
            return Err(SimError::InvalidConfiguration { doors: self.doors });
        }
        if self.trials == 0 {
            return Err(SimError::InvalidTrialCount("trials"));
        }
        if self.chart_points == 0 {
            return Err(SimError::InvalidTrialCount("chart_points"));
        }
        Ok(())
    }

    pub fn strategies(&self) -> Vec<Strategy> {
        match self.switch {
            Some(flag) => vec![Strategy::from(flag)],
            None => Strategy::ALL.to_vec(),
        }
    }

    pub fn worker_threads(&self) -> usize {
        match self.threads {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// Pin the seed, drawing one if none was configured. Returns the seed in use.
    pub fn resolve_seed(&mut self) -> u64 {
        *self.seed.get_or_insert_with(rand::random::<u64>)
    }

    /// sha256 over the serialized config, for tagging runs and reports.
    pub fn fingerprint(&self) -> String {
        let body = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&body))
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "switch" => Some(true),
        "0" | "false" | "no" | "stay" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.strategies(), vec![Strategy::Switch, Strategy::Stay]);
        assert_eq!(cfg.worker_threads(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = Config { doors: 2, ..Config::default() };
        assert_eq!(cfg.validate(), Err(SimError::InvalidConfiguration { doors: 2 }));
        let cfg = Config { trials: 0, ..Config::default() };
        assert_eq!(cfg.validate(), Err(SimError::InvalidTrialCount("trials")));
        let cfg = Config { chart_points: 0, ..Config::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_single_strategy() {
        let cfg = Config { switch: Some(false), ..Config::default() };
        assert_eq!(cfg.strategies(), vec![Strategy::Stay]);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" stay "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_resolve_seed_keeps_configured() {
        let mut cfg = Config { seed: Some(99), ..Config::default() };
        assert_eq!(cfg.resolve_seed(), 99);
        let mut cfg = Config::default();
        let s = cfg.resolve_seed();
        assert_eq!(cfg.seed, Some(s));
    }

    #[test]
    fn test_fingerprint_tracks_fields() {
        let a = Config::default();
        let b = Config { doors: 4, ..Config::default() };
        assert_eq!(a.fingerprint(), Config::default().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_zero_threads_uses_cpus() {
        let cfg = Config { threads: 0, ..Config::default() };
        assert!(cfg.worker_threads() >= 1);
    }
}
