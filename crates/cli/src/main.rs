use anyhow::Context;
use fatedeck_core::{
    duration_lines, DamageType, DeckConfig, DeckMode, DrawSession, EffectPayload, EffectRecord,
    Event, EventBus, SessionConfig, SessionError,
};
use fatedeck_data::{
    builtin_effect_table, load_effect_table, load_session_config, validate_session_config,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

const SEED_ENV: &str = "FATEDECK_SEED";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliOptions {
    seed: Option<u64>,
    max_draw: Option<u32>,
    config: Option<PathBuf>,
    rules: Option<PathBuf>,
}

fn parse_seed(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse::<u64>().ok(),
    }
}

fn parse_cli_options(args: &[String], env_seed: Option<String>) -> CliOptions {
    let mut options = CliOptions {
        seed: env_seed.as_deref().and_then(parse_seed),
        ..CliOptions::default()
    };
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--seed" => {
                if let Some(value) = args.get(idx + 1) {
                    options.seed = parse_seed(value);
                    idx += 1;
                }
            }
            "--max-draw" => {
                if let Some(value) = args.get(idx + 1) {
                    options.max_draw = value.parse::<u32>().ok();
                    idx += 1;
                }
            }
            "--config" => {
                if let Some(value) = args.get(idx + 1) {
                    options.config = Some(PathBuf::from(value));
                    idx += 1;
                }
            }
            "--rules" => {
                if let Some(value) = args.get(idx + 1) {
                    options.rules = Some(PathBuf::from(value));
                    idx += 1;
                }
            }
            _ => {}
        }
        idx += 1;
    }
    options
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

fn build_session(options: &CliOptions) -> anyhow::Result<DrawSession> {
    let mut config = match &options.config {
        Some(path) => load_session_config(path)?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = options.seed {
        config.seed = seed;
    }
    if let Some(max_draw) = options.max_draw {
        config.max_draw = max_draw;
    }
    validate_session_config(&config).context("session settings")?;
    let table = match &options.rules {
        Some(path) => load_effect_table(path)?,
        None => builtin_effect_table(),
    };
    info!(seed = config.seed, max_draw = config.max_draw, "session ready");
    Ok(DrawSession::new(config, table)?)
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_cli_options(&args, std::env::var(SEED_ENV).ok());
    init_logging();
    let mut session = match build_session(&options) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("startup error: {err:#}");
            std::process::exit(1);
        }
    };
    run_repl(&mut session);
}

fn run_repl(session: &mut DrawSession) {
    let mut events = EventBus::default();
    println!(
        "seed: {:#x}  deck: {} cards  max draw: {}",
        session.seed(),
        session.deck().size(),
        session.config().max_draw
    );
    print_help();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();
        let result = match cmd {
            "help" | "h" | "?" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" | "q" => break,
            "deck" => cmd_deck(session, &args, &mut events),
            "draw" | "d" => cmd_draw(session, &args, &mut events),
            "bonus" | "b" => cmd_bonus(session, &mut events),
            "effects" | "e" => {
                print_effects(session);
                Ok(())
            }
            "json" => {
                print_json(session);
                Ok(())
            }
            "resist" | "r" => cmd_resist(session, &args),
            "durations" => {
                print_durations(session);
                Ok(())
            }
            "reward" => cmd_reward(session, &args),
            "roll" => {
                print_rolled(session, &input[cmd.len()..]);
                Ok(())
            }
            "state" | "s" => {
                print_state(session);
                Ok(())
            }
            _ => {
                println!("unknown command: {cmd} (try `help`)");
                Ok(())
            }
        };
        drain_events(&mut events);
        if let Err(err) = result {
            println!("error: {err}");
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  draw [n]                 draw n cards (default from settings)");
    println!("  bonus                    spend a bonus credit on two more cards");
    println!("  deck full|reduced        switch deck");
    println!("  deck custom a,b,c        draw from the listed cards only");
    println!("  effects                  show aggregated effects");
    println!("  json                     dump the effect summary as JSON");
    println!("  resist <index> <type>    choose a resistance for the card at <index>");
    println!("  durations                show resistance durations");
    println!("  reward <option>          choose a reward option");
    println!("  roll <text>              roll every dice expression in text");
    println!("  state                    show current outcome and selections");
    println!("  quit");
}

fn cmd_deck(
    session: &mut DrawSession,
    args: &[&str],
    events: &mut EventBus,
) -> Result<(), SessionError> {
    match args {
        ["full"] => session.configure_deck(DeckMode::Full, None, events),
        ["reduced"] => session.configure_deck(DeckMode::Reduced, None, events),
        ["custom", rest @ ..] => {
            let keys: Vec<&str> = rest
                .iter()
                .flat_map(|arg| arg.split(','))
                .filter(|key| !key.trim().is_empty())
                .collect();
            let config = DeckConfig::custom_from_keys(&keys)?;
            session.configure_deck(DeckMode::Custom, Some(config.members()), events)
        }
        [] => {
            let members: Vec<&str> = session
                .deck()
                .members()
                .iter()
                .map(|card| card.key())
                .collect();
            println!("deck ({}): {}", members.len(), members.join(", "));
            Ok(())
        }
        _ => {
            println!("usage: deck full|reduced|custom a,b,c");
            Ok(())
        }
    }
}

fn cmd_draw(
    session: &mut DrawSession,
    args: &[&str],
    events: &mut EventBus,
) -> Result<(), SessionError> {
    let requested = match args.first() {
        Some(value) => match value.parse::<u32>() {
            Ok(count) => count,
            Err(_) => {
                println!("usage: draw [n]");
                return Ok(());
            }
        },
        None => session.config().default_draw,
    };
    session.draw(requested, events)?;
    print_outcome(session);
    Ok(())
}

fn cmd_bonus(session: &mut DrawSession, events: &mut EventBus) -> Result<(), SessionError> {
    session.bonus_draw(events)?;
    print_outcome(session);
    Ok(())
}

fn cmd_resist(session: &mut DrawSession, args: &[&str]) -> Result<(), SessionError> {
    let [index, damage] = args else {
        println!("usage: resist <index> <type>");
        return Ok(());
    };
    let Ok(index) = index.parse::<usize>() else {
        println!("invalid index: {index}");
        return Ok(());
    };
    let damage = match damage.parse::<DamageType>() {
        Ok(damage) => damage,
        Err(err) => {
            println!("error: {err}");
            return Ok(());
        }
    };
    session.select_resistance(index, damage)?;
    print_durations(session);
    Ok(())
}

fn cmd_reward(session: &mut DrawSession, args: &[&str]) -> Result<(), SessionError> {
    let [key] = args else {
        println!("usage: reward <option>");
        return Ok(());
    };
    session.select_reward(key)?;
    println!("reward chosen: {key}");
    Ok(())
}

fn drain_events(events: &mut EventBus) {
    for event in events.drain() {
        println!("event: {}", format_event(&event));
    }
}

fn format_event(event: &Event) -> String {
    match event {
        Event::DeckConfigured { mode, size } => format!("deck configured: {mode:?} ({size} cards)"),
        Event::CardDrawn { card, index } => format!("drew {card} at #{index}"),
        Event::Halted { index, discarded } => {
            format!("halted at #{index}, {discarded} later draws discarded")
        }
        Event::Extended {
            trigger_index,
            card,
        } => format!("extended by #{trigger_index}: {card}"),
        Event::BonusDrawn { cards } => {
            let keys: Vec<&str> = cards.iter().map(|card| card.key()).collect();
            format!("bonus draw: {}", keys.join(", "))
        }
    }
}

fn print_outcome(session: &DrawSession) {
    let Some(outcome) = session.outcome() else {
        println!("nothing drawn yet");
        return;
    };
    for (index, card) in outcome.cards().iter().enumerate() {
        println!("{index:>2}: {card}");
    }
    if outcome.contains_halt() {
        println!("the draw is closed");
    } else if session.bonus_credits() > 0 {
        println!("bonus credits: {}", session.bonus_credits());
    }
}

fn print_effects(session: &mut DrawSession) {
    let Some(summary) = session.effects() else {
        println!("nothing drawn yet");
        return;
    };
    if !summary.regular.is_empty() {
        println!("effects:");
        for record in &summary.regular {
            print_record(session, record);
        }
    }
    if !summary.curses.is_empty() {
        println!("curses:");
        for record in &summary.curses {
            print_record(session, record);
        }
    }
    for (card, count) in &summary.unmapped {
        println!("  {card} x{count}: no effect on record");
    }
}

fn print_record(session: &mut DrawSession, record: &EffectRecord) {
    let heading = if record.count > 1 {
        format!("{} x{}", record.name, record.count)
    } else {
        record.name.clone()
    };
    match &record.payload {
        EffectPayload::Standard(text) => {
            let rolled = session.roll_text(text);
            println!("  {heading}: {}", rolled.text);
        }
        EffectPayload::ResistanceChoice {
            damage_types,
            selections_required,
        } => {
            let keys: Vec<&str> = damage_types.iter().map(|damage| damage.key()).collect();
            let positions: Vec<String> = session
                .resistance_selections(record.card)
                .into_iter()
                .map(|(index, pick)| match pick {
                    Some(damage) => format!("#{index}={damage}"),
                    None => format!("#{index}=?"),
                })
                .collect();
            println!(
                "  {heading}: choose {selections_required} of {} [{}]",
                keys.join("/"),
                positions.join(" ")
            );
        }
        EffectPayload::RewardChoice(totals) => {
            let options: Vec<String> = totals
                .iter()
                .map(|total| {
                    format!(
                        "{}: {} {} worth {}",
                        total.key, total.quantity, total.label, total.total_value
                    )
                })
                .collect();
            let chosen = session.reward_selection().unwrap_or("none");
            println!("  {heading}: {} (chosen: {chosen})", options.join(" | "));
        }
        EffectPayload::BonusDrawOffer { text, enabled } => {
            let status = if *enabled { "available" } else { "closed" };
            println!("  {heading}: {text} [{status}]");
        }
    }
}

fn print_json(session: &DrawSession) {
    let Some(summary) = session.effects() else {
        println!("nothing drawn yet");
        return;
    };
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("error: {err}"),
    }
}

fn print_durations(session: &DrawSession) {
    let Some(summary) = session.effects() else {
        println!("nothing drawn yet");
        return;
    };
    let mut any = false;
    for record in summary.records() {
        if !matches!(record.payload, EffectPayload::ResistanceChoice { .. }) {
            continue;
        }
        for line in duration_lines(&session.resistance_durations(record.card)) {
            println!("  {}: {line}", record.name);
            any = true;
        }
    }
    if !any {
        println!("no resistances chosen");
    }
}

fn print_rolled(session: &mut DrawSession, text: &str) {
    let rolled = session.roll_text(text.trim());
    println!("{}", rolled.text);
    for skipped in &rolled.skipped {
        println!("  skipped: {skipped}");
    }
}

fn print_state(session: &DrawSession) {
    println!(
        "seed {:#x}  deck {:?} ({} cards)",
        session.seed(),
        session.deck().config().map(|config| config.mode()),
        session.deck().size()
    );
    print_outcome(session);
    let selections = session.selections();
    println!("selection generation: {}", selections.generation());
    if let Some(reward) = selections.reward() {
        println!("reward: {reward}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn flags_override_environment_seed() {
        let options = parse_cli_options(
            &args(&["--seed", "0x2a", "--max-draw", "5", "--rules", "r.json"]),
            Some("7".to_string()),
        );
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.max_draw, Some(5));
        assert_eq!(options.rules, Some(PathBuf::from("r.json")));
        assert_eq!(options.config, None);
    }

    #[test]
    fn environment_seed_applies_without_flag() {
        let options = parse_cli_options(&[], Some("99".to_string()));
        assert_eq!(options.seed, Some(99));
    }

    #[test]
    fn ceiling_flag_reaches_session() {
        let options = CliOptions {
            max_draw: Some(3),
            ..CliOptions::default()
        };
        let mut session = build_session(&options).expect("session");
        let err = session.draw(4, &mut EventBus::default()).unwrap_err();
        assert!(matches!(err, SessionError::CeilingExceeded { requested: 4, max: 3 }));
    }

    #[test]
    fn events_render_as_lines() {
        let line = format_event(&Event::Halted {
            index: 2,
            discarded: 1,
        });
        assert_eq!(line, "halted at #2, 1 later draws discarded");
    }
}
