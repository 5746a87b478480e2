use crate::{CardId, Deck, Event, EventBus, RollSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Cards drawn by one bonus draw.
pub const BONUS_DRAW_CARDS: usize = 2;

/// Per-card tally of an outcome, in canonical card order.
pub type CardCount = BTreeMap<CardId, u32>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("draw count must be at least 1")]
    InvalidCount,
    #[error("deck has no cards to draw")]
    EmptyDeck,
    #[error("halt card already drawn")]
    HaltCardPresent,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("a draw outcome holds at least one card")]
pub struct EmptyOutcome;

/// Final sequence of one resolution pass. Never empty, on the wire as well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<CardId>", into = "Vec<CardId>")]
pub struct DrawOutcome {
    cards: Vec<CardId>,
}

impl TryFrom<Vec<CardId>> for DrawOutcome {
    type Error = EmptyOutcome;

    fn try_from(cards: Vec<CardId>) -> Result<Self, Self::Error> {
        Self::new(cards).ok_or(EmptyOutcome)
    }
}

impl From<DrawOutcome> for Vec<CardId> {
    fn from(outcome: DrawOutcome) -> Self {
        outcome.cards
    }
}

impl DrawOutcome {
    pub fn new(cards: Vec<CardId>) -> Option<Self> {
        if cards.is_empty() {
            return None;
        }
        Some(Self { cards })
    }

    pub fn cards(&self) -> &[CardId] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn get(&self, index: usize) -> Option<CardId> {
        self.cards.get(index).copied()
    }

    pub fn contains(&self, card: CardId) -> bool {
        self.cards.contains(&card)
    }

    pub fn contains_halt(&self) -> bool {
        self.cards.iter().any(|card| card.is_halt())
    }

    pub fn count(&self, card: CardId) -> u32 {
        self.cards.iter().filter(|drawn| **drawn == card).count() as u32
    }

    /// Positions of `card` in draw order; these are the stable occurrence ids.
    pub fn occurrences(&self, card: CardId) -> impl Iterator<Item = usize> + '_ {
        self.cards
            .iter()
            .enumerate()
            .filter(move |(_, drawn)| **drawn == card)
            .map(|(idx, _)| idx)
    }

    pub fn tally(&self) -> CardCount {
        let mut counts = CardCount::new();
        for card in &self.cards {
            *counts.entry(*card).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    Drawing,
    Truncated,
    Extending,
    Final,
}

/// Draws `requested` cards, then applies the halt and extend rules.
///
/// Extension is a single pass over the extend cards present after the
/// initial draw; cards it appends never trigger further extension. The
/// draw ceiling is not consulted here, extensions may exceed it.
pub fn resolve_draw(
    deck: &Deck,
    rng: &mut impl RollSource,
    requested: u32,
    events: &mut EventBus,
) -> Result<DrawOutcome, DrawError> {
    if requested == 0 {
        return Err(DrawError::InvalidCount);
    }
    if deck.size() == 0 {
        return Err(DrawError::EmptyDeck);
    }

    let mut cards: Vec<CardId> = Vec::with_capacity(requested as usize);
    let mut phase = DrawPhase::Drawing;
    loop {
        let next = match phase {
            DrawPhase::Drawing => {
                for _ in 0..requested {
                    draw_into(deck, rng, &mut cards, events)?;
                }
                if truncate_at_halt(&mut cards, events) {
                    DrawPhase::Truncated
                } else if cards.iter().any(|card| card.is_extend()) {
                    DrawPhase::Extending
                } else {
                    DrawPhase::Final
                }
            }
            DrawPhase::Extending => {
                let triggers: Vec<usize> = cards
                    .iter()
                    .enumerate()
                    .filter(|(_, card)| card.is_extend())
                    .map(|(idx, _)| idx)
                    .collect();
                let mut halted = false;
                for trigger_index in triggers {
                    let card = draw_into(deck, rng, &mut cards, events)?;
                    events.push(Event::Extended {
                        trigger_index,
                        card,
                    });
                    if truncate_at_halt(&mut cards, events) {
                        halted = true;
                        break;
                    }
                }
                if halted {
                    DrawPhase::Truncated
                } else {
                    DrawPhase::Final
                }
            }
            DrawPhase::Truncated => DrawPhase::Final,
            DrawPhase::Final => break,
        };
        debug!(from = ?phase, to = ?next, drawn = cards.len(), "draw phase");
        phase = next;
    }

    DrawOutcome::new(cards).ok_or(DrawError::EmptyDeck)
}

/// Draws the two cards a bonus card offers and appends them to `current`.
/// The input outcome is left untouched; callers replace it on success.
pub fn resolve_bonus_draw(
    deck: &Deck,
    rng: &mut impl RollSource,
    current: &DrawOutcome,
    events: &mut EventBus,
) -> Result<DrawOutcome, DrawError> {
    if current.contains_halt() {
        return Err(DrawError::HaltCardPresent);
    }
    if deck.size() == 0 {
        return Err(DrawError::EmptyDeck);
    }

    let mut cards = current.cards.clone();
    let start = cards.len();
    for _ in 0..BONUS_DRAW_CARDS {
        let card = draw_into(deck, rng, &mut cards, events)?;
        if card.is_halt() {
            break;
        }
    }
    truncate_at_halt(&mut cards, events);
    events.push(Event::BonusDrawn {
        cards: cards[start..].to_vec(),
    });
    Ok(DrawOutcome { cards })
}

fn draw_into(
    deck: &Deck,
    rng: &mut impl RollSource,
    cards: &mut Vec<CardId>,
    events: &mut EventBus,
) -> Result<CardId, DrawError> {
    let card = deck.sample_one(rng)?;
    events.push(Event::CardDrawn {
        card,
        index: cards.len(),
    });
    cards.push(card);
    Ok(card)
}

/// Cuts `cards` right after the first halt card. Returns whether one was found.
fn truncate_at_halt(cards: &mut Vec<CardId>, events: &mut EventBus) -> bool {
    let Some(index) = cards.iter().position(|card| card.is_halt()) else {
        return false;
    };
    let discarded = cards.len() - index - 1;
    cards.truncate(index + 1);
    debug!(index, discarded, "halt card drawn");
    events.push(Event::Halted { index, discarded });
    true
}
