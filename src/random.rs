//! Random sources for the trial engine.
//!
//! The engine only needs two operations: a uniform door number and a uniform
//! pick from a candidate set, given by its size and addressed by index. Production code wraps any `rand::Rng`; tests can
//! swap in [`ScriptedSource`] to force exact door sequences.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource {
    /// Uniform door in `1..=door_count`.
    fn uniform_door(&mut self, door_count: u32) -> u32;

    /// Uniform index in `0..len` into a candidate set. Callers guarantee `len > 0`.
    fn choose_index(&mut self, len: u32) -> u32;
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn uniform_door(&mut self, door_count: u32) -> u32 {
        (**self).uniform_door(door_count)
    }

    fn choose_index(&mut self, len: u32) -> u32 {
        (**self).choose_index(len)
    }
}

/// Adapter from any `rand::Rng` to [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform_door(&mut self, door_count: u32) -> u32 {
        self.rng.gen_range(1..=door_count)
    }

    fn choose_index(&mut self, len: u32) -> u32 {
        self.rng.gen_range(0..len)
    }
}

/// Deterministic source replaying fixed draws.
///
/// `doors` feeds `uniform_door` and `picks` feeds `choose_index` (clamped to
/// the set size). Both scripts cycle once exhausted; an empty
/// script yields door 1 / the first candidate.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    doors: Vec<u32>,
    picks: Vec<u32>,
    door_pos: usize,
    pick_pos: usize,
}

impl ScriptedSource {
    pub fn new(doors: Vec<u32>, picks: Vec<u32>) -> Self {
        Self {
            doors,
            picks,
            door_pos: 0,
            pick_pos: 0,
        }
    }

    /// Number of `choose_index` calls served so far.
    pub fn choices_made(&self) -> usize {
        self.pick_pos
    }
}

impl RandomSource for ScriptedSource {
    fn uniform_door(&mut self, door_count: u32) -> u32 {
        let door = if self.doors.is_empty() {
            1
        } else {
            self.doors[self.door_pos % self.doors.len()]
        };
        self.door_pos += 1;
        door.clamp(1, door_count)
    }

    fn choose_index(&mut self, len: u32) -> u32 {
        let idx = if self.picks.is_empty() {
            0
        } else {
            self.picks[self.pick_pos % self.picks.len()]
        };
        self.pick_pos += 1;
        idx.min(len.saturating_sub(1))
    }
}

/// SplitMix64 finalizer over `(seed, stream)`, used to give each worker batch
/// or chart point its own independent seed.
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed
        .wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}
