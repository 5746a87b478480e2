use crate::DiceExpression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sides of the die rolled per hour-block of resistance.
pub const DURATION_DIE_SIDES: u32 = 12;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Acid,
    Cold,
    Fire,
    Lightning,
    Thunder,
    Force,
    Necrotic,
    Poison,
    Psychic,
    Radiant,
}

pub const ELEMENTAL_DAMAGE: [DamageType; 5] = [
    DamageType::Acid,
    DamageType::Cold,
    DamageType::Fire,
    DamageType::Lightning,
    DamageType::Thunder,
];

pub const ARCANE_DAMAGE: [DamageType; 5] = [
    DamageType::Force,
    DamageType::Necrotic,
    DamageType::Poison,
    DamageType::Psychic,
    DamageType::Radiant,
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown damage type: {0}")]
pub struct UnknownDamageType(pub String);

impl DamageType {
    pub fn key(self) -> &'static str {
        match self {
            Self::Acid => "acid",
            Self::Cold => "cold",
            Self::Fire => "fire",
            Self::Lightning => "lightning",
            Self::Thunder => "thunder",
            Self::Force => "force",
            Self::Necrotic => "necrotic",
            Self::Poison => "poison",
            Self::Psychic => "psychic",
            Self::Radiant => "radiant",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DamageType {
    type Err = UnknownDamageType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim().to_lowercase();
        ELEMENTAL_DAMAGE
            .iter()
            .chain(ARCANE_DAMAGE.iter())
            .copied()
            .find(|damage| damage.key() == key)
            .ok_or_else(|| UnknownDamageType(value.to_string()))
    }
}

/// Tallies per-occurrence selections: one increment per occurrence.
pub fn compute_resistance_durations(selections: &[DamageType]) -> BTreeMap<DamageType, u32> {
    let mut tallies = BTreeMap::new();
    for damage in selections {
        *tallies.entry(*damage).or_insert(0) += 1;
    }
    tallies
}

/// Dice for a duration tally: a lone die carries the `kh1` display suffix,
/// larger tallies sum their dice.
pub fn duration_dice(tally: u32) -> DiceExpression {
    DiceExpression::clamped(tally, DURATION_DIE_SIDES).keep_highest(tally <= 1)
}

/// Display lines such as `resistance to acid for 2d12 hours`.
pub fn duration_lines(tallies: &BTreeMap<DamageType, u32>) -> Vec<String> {
    tallies
        .iter()
        .map(|(damage, tally)| format!("resistance to {damage} for {} hours", duration_dice(*tally)))
        .collect()
}
