use crate::RollSource;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Upper bound for both the dice count and the number of sides.
pub const MAX_DICE_VALUE: u32 = 1000;

const KEEP_HIGHEST_ONE: &str = "kh1";

static DICE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9]+d[0-9]+(?:kh[0-9]*)?\b").expect("invalid dice token regex")
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("unparseable dice expression `{token}`: {reason}")]
    Unparseable { token: String, reason: &'static str },
    #[error("{quantity}d{sides} is outside 1..=1000 dice of 1..=1000 sides")]
    OutOfRange { quantity: u32, sides: u32 },
}

/// `<quantity>d<sides>`, optionally suffixed with `kh1`. Both counts stay
/// within `1..=MAX_DICE_VALUE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpression {
    quantity: u32,
    sides: u32,
    keep_highest_one: bool,
}

impl DiceExpression {
    pub fn new(quantity: u32, sides: u32) -> Result<Self, DiceError> {
        let limits = 1..=MAX_DICE_VALUE;
        if !limits.contains(&quantity) || !limits.contains(&sides) {
            return Err(DiceError::OutOfRange { quantity, sides });
        }
        Ok(Self {
            quantity,
            sides,
            keep_highest_one: false,
        })
    }

    /// Like `new`, but pulls both counts into range instead of failing.
    pub fn clamped(quantity: u32, sides: u32) -> Self {
        Self {
            quantity: quantity.clamp(1, MAX_DICE_VALUE),
            sides: sides.clamp(1, MAX_DICE_VALUE),
            keep_highest_one: false,
        }
    }

    pub fn keep_highest(mut self, keep_highest_one: bool) -> Self {
        self.keep_highest_one = keep_highest_one;
        self
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn sides(&self) -> u32 {
        self.sides
    }

    pub fn keeps_highest_one(&self) -> bool {
        self.keep_highest_one
    }

    /// Rolls every die in order. Keep-highest returns the best roll,
    /// otherwise the rolls are summed.
    pub fn evaluate(&self, rng: &mut impl RollSource) -> u32 {
        let rolls = (0..self.quantity).map(|_| rng.roll(1, self.sides));
        if self.keep_highest_one {
            rolls.max().unwrap_or(0)
        } else {
            rolls.fold(0u32, u32::saturating_add)
        }
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.quantity, self.sides)?;
        if self.keep_highest_one {
            f.write_str(KEEP_HIGHEST_ONE)?;
        }
        Ok(())
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let unparseable = |reason: &'static str| DiceError::Unparseable {
            token: token.to_string(),
            reason,
        };
        let (body, keep_highest_one) = match token.find("kh") {
            Some(pos) if &token[pos..] == KEEP_HIGHEST_ONE => (&token[..pos], true),
            Some(_) => return Err(unparseable("only the kh1 modifier is supported")),
            None => (token, false),
        };
        let (quantity, sides) = body
            .split_once('d')
            .ok_or_else(|| unparseable("expected <quantity>d<sides>"))?;
        let quantity =
            parse_bound(quantity).ok_or_else(|| unparseable("quantity must be 1..=1000"))?;
        let sides = parse_bound(sides).ok_or_else(|| unparseable("sides must be 1..=1000"))?;
        Ok(Self::new(quantity, sides)?.keep_highest(keep_highest_one))
    }
}

fn parse_bound(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>()
        .ok()
        .filter(|value| (1..=MAX_DICE_VALUE).contains(value))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolledText {
    pub text: String,
    pub skipped: Vec<DiceError>,
}

/// Replaces each dice token in `text`, left to right, with its rolled value.
/// Tokens that do not parse stay as written and are reported in `skipped`.
pub fn roll_text(text: &str, rng: &mut impl RollSource) -> RolledText {
    let mut skipped = Vec::new();
    let rolled = DICE_TOKEN.replace_all(text, |caps: &Captures<'_>| {
        let token = &caps[0];
        match token.parse::<DiceExpression>() {
            Ok(expr) => expr.evaluate(&mut *rng).to_string(),
            Err(err) => {
                warn!(%err, "leaving dice expression unrolled");
                skipped.push(err);
                token.to_string()
            }
        }
    });
    RolledText {
        text: rolled.into_owned(),
        skipped,
    }
}

pub fn evaluate_in_text(text: &str, rng: &mut impl RollSource) -> String {
    roll_text(text, rng).text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RngState, ScriptedRolls};

    #[test]
    fn parses_plain_and_keep_highest() {
        assert_eq!("2d6".parse(), DiceExpression::new(2, 6));
        let expr: DiceExpression = "1d12kh1".parse().unwrap();
        assert_eq!((expr.quantity(), expr.sides()), (1, 12));
        assert!(expr.keeps_highest_one());
    }

    #[test]
    fn rejects_out_of_range_and_other_modifiers() {
        for token in ["0d6", "2d0", "1001d6", "2d6kh2", "2d", "d6", "99999999999d6", "+2d6"] {
            assert!(
                token.parse::<DiceExpression>().is_err(),
                "{token} should not parse"
            );
        }
    }

    #[test]
    fn display_round_trips_notation() {
        for token in ["3d8", "1d20kh1"] {
            let expr: DiceExpression = token.parse().unwrap();
            assert_eq!(expr.to_string(), token);
        }
    }

    #[test]
    fn sums_forced_rolls_in_text() {
        let mut rng = ScriptedRolls::new([3, 5]);
        assert_eq!(
            evaluate_in_text("You take 2d6 damage", &mut rng),
            "You take 8 damage"
        );
    }

    #[test]
    fn keep_highest_takes_the_best_roll() {
        let mut rng = ScriptedRolls::new([2, 9, 4]);
        let expr = DiceExpression::new(3, 10).unwrap().keep_highest(true);
        assert_eq!(expr.evaluate(&mut rng), 9);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn each_token_rolls_independently_in_order() {
        let mut rng = ScriptedRolls::new([1, 4, 6, 2]);
        assert_eq!(
            evaluate_in_text("1d4 then 1d4, finally 2d6.", &mut rng),
            "1 then 4, finally 8."
        );
    }

    #[test]
    fn constructor_enforces_dice_limits() {
        assert_eq!(
            DiceExpression::new(10_000_000, 1000),
            Err(DiceError::OutOfRange {
                quantity: 10_000_000,
                sides: 1000
            })
        );
        assert!(DiceExpression::new(1, 0).is_err());
        assert!(DiceExpression::new(0, 6).is_err());
        let clamped = DiceExpression::clamped(5000, 0);
        assert_eq!((clamped.quantity(), clamped.sides()), (1000, 1));
    }

    #[test]
    fn largest_expression_sums_without_overflow() {
        let mut rng = RngState::from_seed(1);
        let expr = DiceExpression::new(MAX_DICE_VALUE, MAX_DICE_VALUE).unwrap();
        let value = expr.evaluate(&mut rng);
        assert!((MAX_DICE_VALUE..=MAX_DICE_VALUE * MAX_DICE_VALUE).contains(&value));
    }

    #[test]
    fn non_ascii_digits_are_not_dice() {
        let mut rng = ScriptedRolls::new([4]);
        let rolled = roll_text("\u{663}d6 or 1d6", &mut rng);
        assert_eq!(rolled.text, "\u{663}d6 or 4");
        assert!(rolled.skipped.is_empty());
    }

    #[test]
    fn partial_modifier_is_reported() {
        let mut rng = ScriptedRolls::new([3, 3]);
        let rolled = roll_text("roll 2d6kh now", &mut rng);
        assert_eq!(rolled.text, "roll 2d6kh now");
        assert!(matches!(
            &rolled.skipped[..],
            [DiceError::Unparseable { token, .. }] if token == "2d6kh"
        ));
        assert_eq!(rng.remaining(), 2);
    }

    #[test]
    fn invalid_tokens_are_left_and_reported() {
        let mut rng = ScriptedRolls::new([6]);
        let rolled = roll_text("0d6 and 2d6kh2 but 1d6", &mut rng);
        assert_eq!(rolled.text, "0d6 and 2d6kh2 but 6");
        assert_eq!(rolled.skipped.len(), 2);
        assert!(matches!(
            &rolled.skipped[0],
            DiceError::Unparseable { token, .. } if token == "0d6"
        ));
    }

    #[test]
    fn tokens_must_sit_on_word_boundaries() {
        let mut rng = ScriptedRolls::new([5]);
        assert_eq!(evaluate_in_text("x2d6 and 2d6s", &mut rng), "x2d6 and 2d6s");
        assert_eq!(rng.remaining(), 1);
    }

    #[test]
    fn seeded_rolls_stay_in_range() {
        let mut rng = RngState::from_seed(9);
        let expr = DiceExpression::new(4, 6).unwrap();
        for _ in 0..500 {
            let value = expr.evaluate(&mut rng);
            assert!((4..=24).contains(&value));
        }
    }
}
