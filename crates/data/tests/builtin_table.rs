use fatedeck_core::{
    aggregate_effects, roll_text, CardId, DamageType, DeckMode, DrawOutcome, DrawSession,
    EffectPayload, EventBus, ScriptedRolls, SessionConfig, FULL_DECK,
};
use fatedeck_data::{builtin_effect_table, load_effect_table, load_session_config};
use std::fs;
use CardId::*;

fn standard_text(payload: &EffectPayload) -> &str {
    match payload {
        EffectPayload::Standard(text) => text,
        other => panic!("expected standard text, got {other:?}"),
    }
}

#[test]
fn every_card_in_the_vocabulary_has_a_rule() {
    let table = builtin_effect_table();
    let outcome = DrawOutcome::new(FULL_DECK.to_vec()).expect("non-empty");
    let summary = aggregate_effects(&outcome, &table);
    assert!(summary.unmapped.is_empty());
    assert_eq!(summary.records().count(), FULL_DECK.len());
}

#[test]
fn seeded_session_splits_curses_from_boons() {
    let mut session =
        DrawSession::new(SessionConfig::default(), builtin_effect_table()).expect("session");
    let mut events = EventBus::default();
    let outcome = session.draw(5, &mut events).expect("draw");
    assert_eq!(outcome.cards(), &[Talons, Knight, Knight, Void, Fortune]);

    let summary = session.effects().expect("summary");
    let curses: Vec<CardId> = summary.curses.iter().map(|record| record.card).collect();
    assert_eq!(curses, vec![Talons, Void]);
    let knight = summary.record(Knight).expect("knight record");
    assert_eq!(knight.count, 2);
    assert_eq!(knight.magnitude, None);
    assert!(matches!(
        summary.record(Fortune).map(|record| &record.payload),
        Some(EffectPayload::BonusDrawOffer { enabled: true, .. })
    ));
    assert_eq!(session.bonus_credits(), 1);
}

#[test]
fn stacked_sage_and_ember_from_seed_42() {
    let config = SessionConfig {
        seed: 42,
        ..SessionConfig::default()
    };
    let mut session = DrawSession::new(config, builtin_effect_table()).expect("session");
    session.draw(5, &mut EventBus::default()).expect("draw");
    let summary = session.effects().expect("summary");

    let sage = summary.record(Sage).expect("sage");
    assert_eq!(
        standard_text(&sage.payload),
        "You learn 2 secrets about a creature of your choice."
    );
    let ember = summary.record(Ember).expect("ember");
    assert!(matches!(
        &ember.payload,
        EffectPayload::ResistanceChoice { selections_required: 2, damage_types } if damage_types.len() == 5
    ));

    // ember sits at positions 3 and 6
    session.select_resistance(3, DamageType::Fire).expect("fire");
    session.select_resistance(6, DamageType::Fire).expect("fire");
    let durations = session.resistance_durations(Ember);
    assert_eq!(durations.get(&DamageType::Fire), Some(&2));
}

#[test]
fn single_sun_uses_singular_word() {
    let table = builtin_effect_table();
    let outcome = DrawOutcome::new(vec![Sun]).expect("non-empty");
    let summary = aggregate_effects(&outcome, &table);
    let sun = summary.record(Sun).expect("sun");
    assert_eq!(sun.magnitude, Some(500));
    assert_eq!(
        standard_text(&sun.payload),
        "You gain 500 experience points and 1 wondrous item."
    );
}

#[test]
fn idiot_text_carries_rollable_dice() {
    let table = builtin_effect_table();
    let outcome = DrawOutcome::new(vec![Idiot, Sun, Idiot]).expect("non-empty");
    let summary = aggregate_effects(&outcome, &table);
    let idiot = summary.record(Idiot).expect("idiot");
    assert!(idiot.is_curse);
    let text = standard_text(&idiot.payload);
    assert_eq!(text, "Your Intelligence is permanently reduced by 2d4.");

    let rolled = roll_text(text, &mut ScriptedRolls::new([3, 4]));
    assert_eq!(rolled.text, "Your Intelligence is permanently reduced by 7.");
    assert!(rolled.skipped.is_empty());
}

#[test]
fn hoard_totals_scale_with_count() {
    let table = builtin_effect_table();
    let outcome = DrawOutcome::new(vec![Hoard, Hoard]).expect("non-empty");
    let summary = aggregate_effects(&outcome, &table);
    let Some(EffectPayload::RewardChoice(totals)) =
        summary.record(Hoard).map(|record| &record.payload)
    else {
        panic!("hoard should offer a reward choice");
    };
    let pairs: Vec<(&str, u32, u64)> = totals
        .iter()
        .map(|total| (total.key.as_str(), total.quantity, total.total_value))
        .collect();
    assert_eq!(pairs, vec![("gems", 10, 1000), ("art", 4, 1000)]);
}

#[test]
fn loads_tables_and_config_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rules_path = dir.path().join("rules.json");
    fs::write(
        &rules_path,
        r#"{ "rules": [
            { "card": "moon", "name": "Moon", "rule": {
              "kind": "stacking", "template": "{n} {word}", "per_count": 1,
              "singular": "wish", "plural": "wishes" } }
        ] }"#,
    )
    .expect("write rules");
    let table = load_effect_table(&rules_path).expect("load rules");
    assert_eq!(table.len(), 1);

    let config_path = dir.path().join("session.json");
    fs::write(
        &config_path,
        r#"{ "seed": 7, "max_draw": 10, "deck": { "mode": "custom", "custom": ["moon", "sun"] } }"#,
    )
    .expect("write config");
    let config = load_session_config(&config_path).expect("load config");
    assert_eq!(config.seed, 7);
    assert_eq!(config.max_draw, 10);
    assert_eq!(config.default_draw, 1);
    assert_eq!(config.deck.mode, DeckMode::Custom);
    assert_eq!(config.deck.custom, vec![Moon, Sun]);
}

#[test]
fn rejects_config_with_default_above_ceiling() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    fs::write(&path, r#"{ "max_draw": 3, "default_draw": 4 }"#).expect("write config");
    let err = load_session_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("default_draw 4"));
}

#[test]
fn missing_file_names_the_path() {
    let err = load_effect_table(std::path::Path::new("/nonexistent/rules.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/rules.json"));
}

#[test]
fn outcome_json_is_a_non_empty_card_list() {
    let outcome = DrawOutcome::new(vec![Fortune, Isolation]).expect("non-empty");
    let json = serde_json::to_string(&outcome).expect("serialize");
    assert_eq!(json, r#"["fortune","isolation"]"#);
    let back: DrawOutcome = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, outcome);
    assert!(serde_json::from_str::<DrawOutcome>("[]").is_err());
}
