use crate::{CardId, DrawError, RollSource, FULL_DECK, REDUCED_DECK};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeckMode {
    #[default]
    Full,
    Reduced,
    Custom,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("invalid deck configuration: {0}")]
    InvalidConfiguration(String),
}

/// Validated member set. Built only through [`DeckConfig::new`], so it is
/// never empty and never holds duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckConfig {
    mode: DeckMode,
    members: Vec<CardId>,
}

impl DeckConfig {
    pub fn new(mode: DeckMode, custom: Option<&[CardId]>) -> Result<Self, DeckError> {
        let members = match (mode, custom) {
            (DeckMode::Full, None) => FULL_DECK.to_vec(),
            (DeckMode::Reduced, None) => REDUCED_DECK.to_vec(),
            (DeckMode::Custom, Some(cards)) => {
                let mut members = Vec::with_capacity(cards.len());
                for card in cards {
                    if !members.contains(card) {
                        members.push(*card);
                    }
                }
                if members.is_empty() {
                    return Err(DeckError::InvalidConfiguration(
                        "custom deck has no cards".to_string(),
                    ));
                }
                members
            }
            (DeckMode::Custom, None) => {
                return Err(DeckError::InvalidConfiguration(
                    "custom deck requires a member list".to_string(),
                ))
            }
            (mode, Some(_)) => {
                return Err(DeckError::InvalidConfiguration(format!(
                    "{mode:?} deck does not take a member list"
                )))
            }
        };
        Ok(Self { mode, members })
    }

    /// Parses custom member keys, rejecting anything outside the vocabulary.
    pub fn custom_from_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self, DeckError> {
        let cards = keys
            .iter()
            .map(|key| {
                CardId::from_key(key.as_ref()).ok_or_else(|| {
                    DeckError::InvalidConfiguration(format!("unknown card: {}", key.as_ref()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(DeckMode::Custom, Some(&cards))
    }

    pub fn mode(&self) -> DeckMode {
        self.mode
    }

    pub fn members(&self) -> &[CardId] {
        &self.members
    }
}

/// The active card pool. Sampling is with replacement: drawing never
/// removes a card.
#[derive(Debug, Default, Clone)]
pub struct Deck {
    config: Option<DeckConfig>,
}

impl Deck {
    pub fn new(config: DeckConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    pub fn full() -> Self {
        Self::new(DeckConfig {
            mode: DeckMode::Full,
            members: FULL_DECK.to_vec(),
        })
    }

    /// Replaces the whole configuration; on error the previous one stays.
    pub fn configure(
        &mut self,
        mode: DeckMode,
        custom: Option<&[CardId]>,
    ) -> Result<&DeckConfig, DeckError> {
        let config = DeckConfig::new(mode, custom)?;
        Ok(&*self.config.insert(config))
    }

    pub fn config(&self) -> Option<&DeckConfig> {
        self.config.as_ref()
    }

    pub fn members(&self) -> &[CardId] {
        self.config.as_ref().map_or(&[], |config| config.members())
    }

    pub fn size(&self) -> usize {
        self.members().len()
    }

    pub fn sample_one(&self, rng: &mut impl RollSource) -> Result<CardId, DrawError> {
        let members = self.members();
        if members.is_empty() {
            return Err(DrawError::EmptyDeck);
        }
        let idx = rng.roll(0, (members.len() - 1) as u32) as usize;
        Ok(members[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RngState;

    #[test]
    fn presets_have_expected_sizes() {
        let mut deck = Deck::default();
        assert_eq!(deck.size(), 0);
        assert_eq!(deck.configure(DeckMode::Full, None).map(|c| c.members().len()), Ok(22));
        assert_eq!(deck.configure(DeckMode::Reduced, None).map(|c| c.members().len()), Ok(13));
    }

    #[test]
    fn custom_deck_collapses_duplicates_in_order() {
        let config = DeckConfig::new(
            DeckMode::Custom,
            Some(&[CardId::Sun, CardId::Moon, CardId::Sun]),
        )
        .expect("valid custom");
        assert_eq!(config.members(), &[CardId::Sun, CardId::Moon]);
    }

    #[test]
    fn invalid_configuration_keeps_previous_deck() {
        let mut deck = Deck::full();
        let err = deck.configure(DeckMode::Custom, Some(&[])).unwrap_err();
        assert!(matches!(err, DeckError::InvalidConfiguration(_)));
        assert_eq!(deck.size(), 22);
        assert!(deck.configure(DeckMode::Custom, None).is_err());
        assert!(deck.configure(DeckMode::Full, Some(&[CardId::Sun])).is_err());
        assert_eq!(deck.config().map(DeckConfig::mode), Some(DeckMode::Full));
    }

    #[test]
    fn unknown_custom_key_is_rejected() {
        let err = DeckConfig::custom_from_keys(&["sun", "joker"]).unwrap_err();
        assert_eq!(
            err,
            DeckError::InvalidConfiguration("unknown card: joker".to_string())
        );
        let ok = DeckConfig::custom_from_keys(&["Sun", "moon"]).expect("known keys");
        assert_eq!(ok.members(), &[CardId::Sun, CardId::Moon]);
    }

    #[test]
    fn empty_deck_cannot_sample() {
        let deck = Deck::default();
        let mut rng = RngState::from_seed(1);
        assert_eq!(deck.sample_one(&mut rng), Err(DrawError::EmptyDeck));
    }

    #[test]
    fn sampling_is_with_replacement() {
        let deck = Deck::new(DeckConfig::new(DeckMode::Custom, Some(&[CardId::Key])).unwrap());
        let mut rng = RngState::from_seed(3);
        for _ in 0..5 {
            assert_eq!(deck.sample_one(&mut rng), Ok(CardId::Key));
        }
        assert_eq!(deck.size(), 1);
    }

    #[test]
    fn sampling_converges_to_uniform_frequency() {
        let deck = Deck::full();
        let mut rng = RngState::from_seed(0xC0FFEE);
        let samples = 220_000usize;
        let mut counts = std::collections::HashMap::new();
        for _ in 0..samples {
            let card = deck.sample_one(&mut rng).expect("sample");
            *counts.entry(card).or_insert(0usize) += 1;
        }
        let expected = samples as f64 / deck.size() as f64;
        assert_eq!(counts.len(), 22);
        for (card, count) in counts {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "{card} drawn {count} times, expected ~{expected}");
        }
    }
}
