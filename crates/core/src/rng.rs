use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::collections::VecDeque;

/// Sequential source of uniform values. Every consumer advances the same
/// stream, so calls must happen in a single strict order.
pub trait RollSource {
    /// Uniform real in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform integer in `[min, max]`, inclusive on both ends.
    fn roll(&mut self, min: u32, max: u32) -> u32 {
        debug_assert!(min <= max, "roll range {min}..={max} is empty");
        let span = u64::from(max - min) + 1;
        let offset = (self.next_unit() * span as f64).floor() as u64;
        // next_unit() < 1.0 keeps offset < span; the min() guards float edge cases.
        min + offset.min(span - 1) as u32
    }
}

#[derive(Debug, Clone)]
pub struct RngState {
    seed: u64,
    rng: Pcg64Mcg,
}

impl RngState {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

impl RollSource for RngState {
    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Replays a fixed list of rolls, clamped into each requested range. Once
/// exhausted every roll returns the range minimum.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    rolls: VecDeque<u32>,
}

impl ScriptedRolls {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RollSource for ScriptedRolls {
    fn next_unit(&mut self) -> f64 {
        0.0
    }

    fn roll(&mut self, min: u32, max: u32) -> u32 {
        self.rolls.pop_front().map_or(min, |value| value.clamp(min, max))
    }
}

impl<R: RollSource + ?Sized> RollSource for &mut R {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }

    fn roll(&mut self, min: u32, max: u32) -> u32 {
        (**self).roll(min, max)
    }
}
