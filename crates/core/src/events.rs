use crate::{CardId, DeckMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    DeckConfigured {
        mode: DeckMode,
        size: usize,
    },
    CardDrawn {
        card: CardId,
        index: usize,
    },
    Halted {
        index: usize,
        discarded: usize,
    },
    Extended {
        trigger_index: usize,
        card: CardId,
    },
    BonusDrawn {
        cards: Vec<CardId>,
    },
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<Event>,
}

impl EventBus {
    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }
}
