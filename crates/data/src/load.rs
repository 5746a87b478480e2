use anyhow::{bail, ensure, Context};
use fatedeck_core::{CardRule, EffectRule, EffectTable, SessionConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

const BUILTIN_RULES: &[u8] = include_bytes!("../cards.json");

/// Reward cards always offer a choice between exactly this many options.
pub const REWARD_OPTION_COUNT: usize = 2;

#[derive(Debug, Deserialize)]
struct RawRuleTable {
    rules: Vec<CardRule>,
}

/// The rule table shipped with the crate.
pub fn builtin_effect_table() -> EffectTable {
    parse_effect_table(BUILTIN_RULES).expect("built-in cards.json must be valid")
}

pub fn parse_effect_table(json_bytes: &[u8]) -> anyhow::Result<EffectTable> {
    let raw: RawRuleTable = serde_json::from_slice(json_bytes).context("parse rule table JSON")?;
    validate_rules(&raw.rules)?;
    Ok(EffectTable::new(raw.rules))
}

pub fn load_effect_table(path: &Path) -> anyhow::Result<EffectTable> {
    let raw: RawRuleTable = load_json(path)?;
    validate_rules(&raw.rules).with_context(|| format!("validate {}", path.display()))?;
    info!(path = %path.display(), rules = raw.rules.len(), "loaded rule table");
    Ok(EffectTable::new(raw.rules))
}

pub fn load_session_config(path: &Path) -> anyhow::Result<SessionConfig> {
    let config: SessionConfig = load_json(path)?;
    validate_session_config(&config).with_context(|| format!("validate {}", path.display()))?;
    Ok(config)
}

pub fn validate_session_config(config: &SessionConfig) -> anyhow::Result<()> {
    ensure!(config.max_draw >= 1, "max_draw must be at least 1");
    ensure!(
        (1..=config.max_draw).contains(&config.default_draw),
        "default_draw {} must be within 1..={}",
        config.default_draw,
        config.max_draw
    );
    config.deck.build().context("deck settings")?;
    Ok(())
}

pub fn validate_rules(rules: &[CardRule]) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.card) {
            bail!("duplicate rule for card {}", rule.card);
        }
        validate_rule(rule).with_context(|| format!("card {}", rule.card))?;
    }
    Ok(())
}

fn validate_rule(rule: &CardRule) -> anyhow::Result<()> {
    match &rule.rule {
        EffectRule::Fixed { text } | EffectRule::BonusOffer { text } => {
            ensure!(!text.trim().is_empty(), "effect text is empty");
        }
        EffectRule::Stacking {
            template,
            per_count,
            singular,
            plural,
        } => {
            ensure!(template.contains("{n}"), "stacking template lacks {{n}}");
            ensure!(*per_count >= 1, "per_count must be at least 1");
            if template.contains("{word}") {
                ensure!(
                    singular.is_some() && plural.is_some(),
                    "template uses {{word}} without singular and plural forms"
                );
            }
        }
        EffectRule::Resistance { damage_types } => {
            ensure!(!damage_types.is_empty(), "resistance offers no damage types");
            let unique: HashSet<_> = damage_types.iter().collect();
            ensure!(
                unique.len() == damage_types.len(),
                "resistance lists a damage type twice"
            );
        }
        EffectRule::Reward { options } => {
            ensure!(
                options.len() == REWARD_OPTION_COUNT,
                "reward must offer exactly {} options, found {}",
                REWARD_OPTION_COUNT,
                options.len()
            );
            let keys: HashSet<_> = options.iter().map(|option| option.key.as_str()).collect();
            ensure!(keys.len() == options.len(), "reward option keys repeat");
            for option in options {
                ensure!(
                    option.quantity >= 1,
                    "reward option {} grants nothing",
                    option.key
                );
            }
        }
    }
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}
