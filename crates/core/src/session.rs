use crate::{
    aggregate_effects, compute_resistance_durations, resolve_bonus_draw, resolve_draw, roll_text,
    CardId, DamageType, Deck, DeckError, DeckMode, DrawError, DrawOutcome, EffectSummary,
    EffectTable, Event, EventBus, RngState, RolledText, SessionConfig, BONUS_CARD,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("requested {requested} cards, at most {max} may be drawn")]
    CeilingExceeded { requested: u32, max: u32 },
    #[error("nothing has been drawn yet")]
    NoOutcome,
    #[error("no bonus draws remain")]
    NoBonusCredit,
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("draw #{0} is not a resistance card")]
    NotAResistanceDraw(usize),
    #[error("{card} does not offer {damage} resistance")]
    DamageTypeNotOffered { card: CardId, damage: DamageType },
    #[error("no reward card was drawn")]
    NoRewardDraw,
    #[error("unknown reward option: {0}")]
    UnknownReward(String),
}

/// Player choices for the current outcome. Resistance picks are keyed by
/// the draw position of the card they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    generation: u64,
    resistances: BTreeMap<usize, DamageType>,
    reward: Option<String>,
}

impl SelectionState {
    fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.resistances.clear();
        self.reward = None;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn resistance(&self, occurrence: usize) -> Option<DamageType> {
        self.resistances.get(&occurrence).copied()
    }

    pub fn reward(&self) -> Option<&str> {
        self.reward.as_deref()
    }
}

pub type SharedSession = Arc<Mutex<DrawSession>>;

/// One player's draw session. Owns the only PRNG, so every roll and draw
/// goes through here in call order.
#[derive(Debug)]
pub struct DrawSession {
    config: SessionConfig,
    table: EffectTable,
    rng: RngState,
    deck: Deck,
    outcome: Option<DrawOutcome>,
    generation: u64,
    bonus_used: u32,
    selections: SelectionState,
}

impl DrawSession {
    pub fn new(config: SessionConfig, table: EffectTable) -> Result<Self, SessionError> {
        let deck = Deck::new(config.deck.build()?);
        Ok(Self {
            rng: RngState::from_seed(config.seed),
            config,
            table,
            deck,
            outcome: None,
            generation: 0,
            bonus_used: 0,
            selections: SelectionState::default(),
        })
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn table(&self) -> &EffectTable {
        &self.table
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn outcome(&self) -> Option<&DrawOutcome> {
        self.outcome.as_ref()
    }

    pub fn selections(&self) -> &SelectionState {
        &self.selections
    }

    /// Swaps the deck wholesale. The current outcome is kept.
    pub fn configure_deck(
        &mut self,
        mode: DeckMode,
        custom: Option<&[CardId]>,
        events: &mut EventBus,
    ) -> Result<(), SessionError> {
        let config = self.deck.configure(mode, custom)?;
        events.push(Event::DeckConfigured {
            mode: config.mode(),
            size: config.members().len(),
        });
        Ok(())
    }

    pub fn draw(
        &mut self,
        requested: u32,
        events: &mut EventBus,
    ) -> Result<&DrawOutcome, SessionError> {
        if requested > self.config.max_draw {
            return Err(SessionError::CeilingExceeded {
                requested,
                max: self.config.max_draw,
            });
        }
        let outcome = resolve_draw(&self.deck, &mut self.rng, requested, events)?;
        self.bonus_used = 0;
        Ok(self.replace_outcome(outcome))
    }

    /// Remaining bonus draws: bonus cards in the outcome minus those spent.
    pub fn bonus_credits(&self) -> u32 {
        self.outcome
            .as_ref()
            .map_or(0, |outcome| outcome.count(BONUS_CARD))
            .saturating_sub(self.bonus_used)
    }

    pub fn bonus_draw(&mut self, events: &mut EventBus) -> Result<&DrawOutcome, SessionError> {
        let current = self.outcome.as_ref().ok_or(SessionError::NoOutcome)?;
        if current.contains_halt() {
            return Err(DrawError::HaltCardPresent.into());
        }
        if self.bonus_credits() == 0 {
            return Err(SessionError::NoBonusCredit);
        }
        let outcome = resolve_bonus_draw(&self.deck, &mut self.rng, current, events)?;
        self.bonus_used += 1;
        Ok(self.replace_outcome(outcome))
    }

    fn replace_outcome(&mut self, outcome: DrawOutcome) -> &DrawOutcome {
        self.generation += 1;
        self.selections.reset(self.generation);
        debug!(generation = self.generation, cards = outcome.len(), "outcome replaced");
        self.outcome.insert(outcome)
    }

    pub fn effects(&self) -> Option<EffectSummary> {
        self.outcome
            .as_ref()
            .map(|outcome| aggregate_effects(outcome, &self.table))
    }

    pub fn select_resistance(
        &mut self,
        occurrence: usize,
        damage: DamageType,
    ) -> Result<(), SessionError> {
        let outcome = self.outcome.as_ref().ok_or(SessionError::NoOutcome)?;
        let card = outcome
            .get(occurrence)
            .ok_or(SelectionError::NotAResistanceDraw(occurrence))?;
        let offered = self
            .table
            .resistance_types(card)
            .ok_or(SelectionError::NotAResistanceDraw(occurrence))?;
        if !offered.contains(&damage) {
            return Err(SelectionError::DamageTypeNotOffered { card, damage }.into());
        }
        self.selections.resistances.insert(occurrence, damage);
        Ok(())
    }

    /// Every occurrence of `card` in draw order with its pick, if made.
    pub fn resistance_selections(&self, card: CardId) -> Vec<(usize, Option<DamageType>)> {
        let Some(outcome) = self.outcome.as_ref() else {
            return Vec::new();
        };
        outcome
            .occurrences(card)
            .map(|idx| (idx, self.selections.resistance(idx)))
            .collect()
    }

    /// Duration tallies for the picks made so far on `card`.
    pub fn resistance_durations(&self, card: CardId) -> BTreeMap<DamageType, u32> {
        let chosen: Vec<DamageType> = self
            .resistance_selections(card)
            .into_iter()
            .filter_map(|(_, damage)| damage)
            .collect();
        compute_resistance_durations(&chosen)
    }

    pub fn select_reward(&mut self, key: &str) -> Result<(), SessionError> {
        let outcome = self.outcome.as_ref().ok_or(SessionError::NoOutcome)?;
        let options = outcome
            .tally()
            .into_keys()
            .find_map(|card| self.table.reward_options(card))
            .ok_or(SelectionError::NoRewardDraw)?;
        let option = options
            .iter()
            .find(|option| option.key == key)
            .ok_or_else(|| SelectionError::UnknownReward(key.to_string()))?;
        self.selections.reward = Some(option.key.clone());
        Ok(())
    }

    pub fn reward_selection(&self) -> Option<&str> {
        self.selections.reward()
    }

    /// Rolls every dice expression in `text` with the session PRNG.
    pub fn roll_text(&mut self, text: &str) -> RolledText {
        roll_text(text, &mut self.rng)
    }
}
