use thiserror::Error;

/// Smallest door count for which the host always has a door to open.
pub const MIN_DOORS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("invalid configuration: {doors} doors (need at least 3)")]
    InvalidConfiguration { doors: u32 },

    #[error("invalid trial count: {0} must be at least 1")]
    InvalidTrialCount(&'static str),

    #[error("cannot fit a trend line to an empty series")]
    EmptySeries,

    #[error("worker thread for batch {0} panicked")]
    WorkerPanicked(usize),

    #[error("series length mismatch: {xs} x values, {ys} y values")]
    LengthMismatch { xs: usize, ys: usize },
}

pub type SimResult<T> = Result<T, SimError>;
