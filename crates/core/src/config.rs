use crate::{CardId, DeckConfig, DeckError, DeckMode, FULL_DECK};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SEED: u64 = 0xC0FFEE;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeckSettings {
    pub mode: DeckMode,
    pub custom: Vec<CardId>,
}

impl DeckSettings {
    pub fn build(&self) -> Result<DeckConfig, DeckError> {
        let custom = (!self.custom.is_empty()).then_some(self.custom.as_slice());
        DeckConfig::new(self.mode, custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub seed: u64,
    /// Ceiling on requested draws. Extensions may still go past it.
    pub max_draw: u32,
    pub default_draw: u32,
    pub deck: DeckSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            max_draw: FULL_DECK.len() as u32,
            default_draw: 1,
            deck: DeckSettings::default(),
        }
    }
}
