use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every card the deck can hold. Declaration order is the canonical order
/// of the full deck and of tallies.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum CardId {
    Champion,
    Isolation,
    Wanderer,
    Fortune,
    Ember,
    Ward,
    Hoard,
    Sage,
    Sun,
    Star,
    Moon,
    Knight,
    Key,
    Throne,
    Vizier,
    Skull,
    Flames,
    Ruin,
    Talons,
    Fool,
    Idiot,
    Void,
}

/// Ends all further drawing at its first occurrence.
pub const HALT_CARD: CardId = CardId::Isolation;
/// Appends one extra draw per occurrence, ignoring the draw ceiling.
pub const EXTEND_CARD: CardId = CardId::Wanderer;
/// Offers the player two more cards per occurrence.
pub const BONUS_CARD: CardId = CardId::Fortune;

pub const FULL_DECK: [CardId; 22] = [
    CardId::Champion,
    CardId::Isolation,
    CardId::Wanderer,
    CardId::Fortune,
    CardId::Ember,
    CardId::Ward,
    CardId::Hoard,
    CardId::Sage,
    CardId::Sun,
    CardId::Star,
    CardId::Moon,
    CardId::Knight,
    CardId::Key,
    CardId::Throne,
    CardId::Vizier,
    CardId::Skull,
    CardId::Flames,
    CardId::Ruin,
    CardId::Talons,
    CardId::Fool,
    CardId::Idiot,
    CardId::Void,
];

pub const REDUCED_DECK: [CardId; 13] = [
    CardId::Champion,
    CardId::Isolation,
    CardId::Wanderer,
    CardId::Fortune,
    CardId::Ember,
    CardId::Sun,
    CardId::Moon,
    CardId::Star,
    CardId::Key,
    CardId::Knight,
    CardId::Skull,
    CardId::Flames,
    CardId::Idiot,
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown card: {0}")]
pub struct UnknownCard(pub String);

impl CardId {
    pub fn all() -> &'static [CardId] {
        &FULL_DECK
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Champion => "champion",
            Self::Isolation => "isolation",
            Self::Wanderer => "wanderer",
            Self::Fortune => "fortune",
            Self::Ember => "ember",
            Self::Ward => "ward",
            Self::Hoard => "hoard",
            Self::Sage => "sage",
            Self::Sun => "sun",
            Self::Star => "star",
            Self::Moon => "moon",
            Self::Knight => "knight",
            Self::Key => "key",
            Self::Throne => "throne",
            Self::Vizier => "vizier",
            Self::Skull => "skull",
            Self::Flames => "flames",
            Self::Ruin => "ruin",
            Self::Talons => "talons",
            Self::Fool => "fool",
            Self::Idiot => "idiot",
            Self::Void => "void",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        FULL_DECK.iter().copied().find(|card| card.key() == value)
    }

    pub fn is_halt(self) -> bool {
        self == HALT_CARD
    }

    pub fn is_extend(self) -> bool {
        self == EXTEND_CARD
    }

    pub fn is_bonus(self) -> bool {
        self == BONUS_CARD
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CardId {
    type Err = UnknownCard;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_key(value).ok_or_else(|| UnknownCard(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_round_trip_through_from_key() {
        for card in CardId::all() {
            assert_eq!(CardId::from_key(card.key()), Some(*card));
        }
        assert_eq!("  Champion ".parse::<CardId>(), Ok(CardId::Champion));
        assert!("joker".parse::<CardId>().is_err());
    }

    #[test]
    fn reduced_deck_is_unique_subset() {
        let full: HashSet<_> = FULL_DECK.iter().collect();
        let reduced: HashSet<_> = REDUCED_DECK.iter().collect();
        assert_eq!(reduced.len(), 13);
        assert!(reduced.is_subset(&full));
        assert_eq!(full.len(), 22);
    }

    #[test]
    fn special_cards_are_distinct() {
        assert!(HALT_CARD.is_halt() && !HALT_CARD.is_extend());
        assert!(EXTEND_CARD.is_extend() && !EXTEND_CARD.is_bonus());
        assert!(BONUS_CARD.is_bonus() && !BONUS_CARD.is_halt());
    }
}
