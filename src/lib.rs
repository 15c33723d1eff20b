//! Monty Hall simulator: repeated trials under the switch and stay strategies,
//! plus the data behind a convergence chart.

pub mod batch;
pub mod config;
pub mod convergence;
pub mod engine;
pub mod error;
pub mod logging;
pub mod random;
pub mod report;
pub mod trend;

pub use engine::{simulate, theoretical_win_rate, Strategy, Tally, TrialEngine, TrialOutcome};
pub use error::{SimError, SimResult};
pub use random::{RandomSource, RngSource, ScriptedSource};
