use crate::{CardId, DamageType, DrawOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a card's count turns into an effect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectRule {
    /// Same text no matter how many copies were drawn.
    Fixed { text: String },
    /// `{n}` is `per_count * count`; `{word}` picks the singular form only
    /// when a single copy was drawn.
    Stacking {
        template: String,
        per_count: u32,
        #[serde(default)]
        singular: Option<String>,
        #[serde(default)]
        plural: Option<String>,
    },
    Resistance { damage_types: Vec<DamageType> },
    Reward { options: Vec<RewardOption> },
    BonusOffer { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardOption {
    pub key: String,
    pub label: String,
    /// Units granted per drawn copy.
    pub quantity: u32,
    pub unit_value: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardRule {
    pub card: CardId,
    pub name: String,
    #[serde(default)]
    pub curse: bool,
    pub rule: EffectRule,
}

/// Static per-card rule lookup, supplied once by the host.
#[derive(Debug, Clone, Default)]
pub struct EffectTable {
    rules: BTreeMap<CardId, CardRule>,
}

impl EffectTable {
    pub fn new(rules: impl IntoIterator<Item = CardRule>) -> Self {
        Self {
            rules: rules.into_iter().map(|rule| (rule.card, rule)).collect(),
        }
    }

    pub fn get(&self, card: CardId) -> Option<&CardRule> {
        self.rules.get(&card)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &CardRule> {
        self.rules.values()
    }

    /// Damage types a resistance card offers, if it is one.
    pub fn resistance_types(&self, card: CardId) -> Option<&[DamageType]> {
        match &self.get(card)?.rule {
            EffectRule::Resistance { damage_types } => Some(damage_types.as_slice()),
            _ => None,
        }
    }

    pub fn reward_options(&self, card: CardId) -> Option<&[RewardOption]> {
        match &self.get(card)?.rule {
            EffectRule::Reward { options } => Some(options.as_slice()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardTotal {
    pub key: String,
    pub label: String,
    pub quantity: u32,
    pub unit_value: u32,
    pub total_value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EffectPayload {
    Standard(String),
    ResistanceChoice {
        damage_types: Vec<DamageType>,
        selections_required: u32,
    },
    RewardChoice(Vec<RewardTotal>),
    BonusDrawOffer {
        text: String,
        enabled: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectRecord {
    pub card: CardId,
    pub name: String,
    pub count: u32,
    pub magnitude: Option<u32>,
    pub payload: EffectPayload,
    pub is_curse: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectSummary {
    pub regular: Vec<EffectRecord>,
    pub curses: Vec<EffectRecord>,
    /// Drawn cards with no rule in the table.
    pub unmapped: Vec<(CardId, u32)>,
}

impl EffectSummary {
    pub fn records(&self) -> impl Iterator<Item = &EffectRecord> {
        self.regular.iter().chain(self.curses.iter())
    }

    pub fn record(&self, card: CardId) -> Option<&EffectRecord> {
        self.records().find(|record| record.card == card)
    }
}

/// Tallies `outcome` and resolves one record per mapped card, split into
/// regular effects and curses. Both lists follow canonical card order.
pub fn aggregate_effects(outcome: &DrawOutcome, table: &EffectTable) -> EffectSummary {
    let halted = outcome.contains_halt();
    let mut summary = EffectSummary::default();
    for (card, count) in outcome.tally() {
        let Some(rule) = table.get(card) else {
            summary.unmapped.push((card, count));
            continue;
        };
        let (payload, magnitude) = resolve_payload(&rule.rule, count, halted);
        let record = EffectRecord {
            card,
            name: rule.name.clone(),
            count,
            magnitude,
            payload,
            is_curse: rule.curse,
        };
        if record.is_curse {
            summary.curses.push(record);
        } else {
            summary.regular.push(record);
        }
    }
    summary
}

fn resolve_payload(rule: &EffectRule, count: u32, halted: bool) -> (EffectPayload, Option<u32>) {
    match rule {
        EffectRule::Fixed { text } => (EffectPayload::Standard(text.clone()), None),
        EffectRule::Stacking {
            template,
            per_count,
            singular,
            plural,
        } => {
            let magnitude = per_count.saturating_mul(count);
            let word = if count == 1 { singular } else { plural };
            let text = template
                .replace("{n}", &magnitude.to_string())
                .replace("{count}", &count.to_string())
                .replace("{word}", word.as_deref().unwrap_or(""));
            (EffectPayload::Standard(text), Some(magnitude))
        }
        EffectRule::Resistance { damage_types } => (
            EffectPayload::ResistanceChoice {
                damage_types: damage_types.clone(),
                selections_required: count,
            },
            None,
        ),
        EffectRule::Reward { options } => {
            let totals = options
                .iter()
                .map(|option| {
                    let quantity = option.quantity.saturating_mul(count);
                    RewardTotal {
                        key: option.key.clone(),
                        label: option.label.clone(),
                        quantity,
                        unit_value: option.unit_value,
                        total_value: u64::from(quantity) * u64::from(option.unit_value),
                    }
                })
                .collect();
            (EffectPayload::RewardChoice(totals), None)
        }
        EffectRule::BonusOffer { text } => (
            EffectPayload::BonusDrawOffer {
                text: text.clone(),
                enabled: !halted,
            },
            None,
        ),
    }
}
