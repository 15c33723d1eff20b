//! Monty Hall trial engine.
//!
//! One trial: the prize is hidden behind a uniform door, the player picks a
//! uniform door, the host opens a door that is neither, and the player either
//! stays or moves to another closed door. The engine keeps win/loss counters
//! for its whole lifetime and has no other side effects.

use serde::Serialize;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::error::{SimError, SimResult, MIN_DOORS};
use crate::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Switch,
    Stay,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Switch, Strategy::Stay];

    pub fn switches(&self) -> bool {
        matches!(self, Strategy::Switch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Switch => "switch",
            Strategy::Stay => "stay",
        }
    }

    /// Wording used in the CLI report line.
    pub fn describe(&self) -> &'static str {
        match self {
            Strategy::Switch => "switching",
            Strategy::Stay => "not switching",
        }
    }
}

impl From<bool> for Strategy {
    fn from(switch: bool) -> Self {
        if switch {
            Strategy::Switch
        } else {
            Strategy::Stay
        }
    }
}

/// Snapshot of win/loss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub wins: u64,
    pub losses: u64,
}

impl Tally {
    pub fn trials(&self) -> u64 {
        self.wins + self.losses
    }

    /// Empirical win rate; 0.0 before any trial has run.
    pub fn win_rate(&self) -> f64 {
        match self.trials() {
            0 => 0.0,
            n => self.wins as f64 / n as f64,
        }
    }
}

impl Add for Tally {
    type Output = Tally;

    fn add(self, rhs: Tally) -> Tally {
        Tally {
            wins: self.wins + rhs.wins,
            losses: self.losses + rhs.losses,
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Tally) {
        self.wins += rhs.wins;
        self.losses += rhs.losses;
    }
}

impl Sum for Tally {
    fn sum<I: Iterator<Item = Tally>>(iter: I) -> Tally {
        iter.fold(Tally::default(), Add::add)
    }
}

/// Everything that happened in one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialOutcome {
    pub prize_door: u32,
    pub initial_pick: u32,
    pub revealed_door: u32,
    pub final_pick: u32,
    pub won: bool,
}

pub struct TrialEngine<R> {
    door_count: u32,
    strategy: Strategy,
    wins: u64,
    losses: u64,
    rng: R,
}

impl<R: RandomSource> TrialEngine<R> {
    pub fn new(door_count: u32, strategy: Strategy, rng: R) -> SimResult<Self> {
        if door_count < MIN_DOORS {
            return Err(SimError::InvalidConfiguration { doors: door_count });
        }
        Ok(Self {
            door_count,
            strategy,
            wins: 0,
            losses: 0,
            rng,
        })
    }

    pub fn door_count(&self) -> u32 {
        self.door_count
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn wins(&self) -> u64 {
        self.wins
    }

    pub fn losses(&self) -> u64 {
        self.losses
    }

    pub fn trials(&self) -> u64 {
        self.wins + self.losses
    }

    pub fn tally(&self) -> Tally {
        Tally {
            wins: self.wins,
            losses: self.losses,
        }
    }

    /// Play one game and update the counters.
    pub fn run_trial(&mut self) -> TrialOutcome {
        let prize_door = self.rng.uniform_door(self.door_count);
        let initial_pick = self.rng.uniform_door(self.door_count);

        // door_count >= 3 leaves at least one door outside {prize, pick}
        let revealed_door = self.draw_excluding(prize_door, initial_pick);

        let final_pick = if self.strategy.switches() {
            self.draw_excluding(initial_pick, revealed_door)
        } else {
            initial_pick
        };

        let won = final_pick == prize_door;
        if won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }

        TrialOutcome {
            prize_door,
            initial_pick,
            revealed_door,
            final_pick,
            won,
        }
    }

    /// Run `n` trials and return the cumulative tally.
    pub fn run(&mut self, n: u64) -> Tally {
        for _ in 0..n {
            self.run_trial();
        }
        self.tally()
    }

    /// Uniform door outside `{a, b}`. A lone candidate is returned without a draw.
    ///
    /// The candidate set is never built: an index into the ascending candidate
    /// order is drawn and mapped past the excluded doors, so memory stays
    /// constant for any door count.
    fn draw_excluding(&mut self, a: u32, b: u32) -> u32 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let remaining = self.door_count - if lo == hi { 1 } else { 2 };
        let k = match remaining {
            1 => 0,
            n => self.rng.choose_index(n),
        };
        nth_door_excluding(k, lo, hi)
    }
}

/// The `k`-th (0-based) door of `1..=n` in ascending order once `lo` and `hi`
/// are removed. Requires `lo <= hi`.
fn nth_door_excluding(k: u32, lo: u32, hi: u32) -> u32 {
    let mut door = k + 1;
    if door >= lo {
        door += 1;
    }
    if hi != lo && door >= hi {
        door += 1;
    }
    door
}

/// Fresh engine, `trials` games, final tally.
pub fn simulate<R: RandomSource>(
    door_count: u32,
    strategy: Strategy,
    trials: u64,
    rng: R,
) -> SimResult<Tally> {
    let mut engine = TrialEngine::new(door_count, strategy, rng)?;
    Ok(engine.run(trials))
}

/// Long-run win probability for a strategy with `door_count` doors.
///
/// Staying wins only when the first pick was right (`1/n`). Switching wins when
/// the first pick was wrong and the uniform re-pick among the `n-2` remaining
/// closed doors hits the prize: `(n-1)/n * 1/(n-2)`.
pub fn theoretical_win_rate(door_count: u32, strategy: Strategy) -> SimResult<f64> {
    if door_count < MIN_DOORS {
        return Err(SimError::InvalidConfiguration { doors: door_count });
    }
    let n = door_count as f64;
    Ok(match strategy {
        Strategy::Stay => 1.0 / n,
        Strategy::Switch => (n - 1.0) / (n * (n - 2.0)),
    })
}
