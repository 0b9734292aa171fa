use serde::Serialize;

use super::super::domain::{InfractionDefinition, InfractionId};

/// Sentinel stored in the repeat-rate column when an offense has no distinct repeat rate.
pub const NOT_APPLICABLE: &str = "Non applicable";

const NO_RATE_SENTINELS: [&str; 3] = ["non applicable", "///", ""];
const NO_POINTS_SENTINELS: [&str; 5] = ["aucun", "aucune", "non applicable", "///", ""];
const REVOCATION_KEYWORDS: [&str; 6] = [
    "suppression",
    "révocation",
    "revocation",
    "retrait du permis",
    "retrait de permis",
    "annulation du permis",
];
const MINUTE_UNITS: [&str; 4] = ["minutes", "minute", "mins", "min"];

/// Typed reading of one free-text rate column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RateValue {
    Numeric(u64),
    NotApplicable,
    Revoked,
}

impl RateValue {
    pub fn numeric(self) -> u64 {
        match self {
            RateValue::Numeric(value) => value,
            RateValue::NotApplicable | RateValue::Revoked => 0,
        }
    }

    /// Currency columns: the first run of digits, zero when there is none.
    pub fn parse_amount(text: &str) -> Self {
        if is_sentinel(text, &NO_RATE_SENTINELS) {
            return RateValue::NotApplicable;
        }
        RateValue::Numeric(first_number(text).unwrap_or(0))
    }

    /// Point columns: any revocation wording wins over digits.
    pub fn parse_points(text: &str) -> Self {
        let lower = text.to_lowercase();
        if REVOCATION_KEYWORDS
            .iter()
            .any(|keyword| lower.contains(keyword))
        {
            return RateValue::Revoked;
        }
        if is_sentinel(text, &NO_POINTS_SENTINELS) {
            return RateValue::NotApplicable;
        }
        RateValue::Numeric(first_number(text).unwrap_or(0))
    }
}

/// Point outcome of a single infraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointDeduction {
    Points(u32),
    Revoked,
}

/// Fully resolved penalty of one infraction under a given classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedRate {
    pub amount: u64,
    pub points: PointDeduction,
    pub detention_minutes: u32,
}

/// Penalty columns of a definition, parsed once at the catalog boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PenaltySchedule {
    pub infraction: InfractionId,
    pub base_amount: RateValue,
    pub repeat_amount: RateValue,
    pub points: RateValue,
    pub detention_minutes: Option<u32>,
    pub repeat_detention_minutes: Option<u32>,
}

impl PenaltySchedule {
    pub fn from_definition(definition: &InfractionDefinition) -> Self {
        Self {
            infraction: definition.id,
            base_amount: RateValue::parse_amount(&definition.montant),
            repeat_amount: RateValue::parse_amount(&definition.recidive),
            points: RateValue::parse_points(&definition.retrait_points),
            detention_minutes: minutes_in(&definition.prison),
            repeat_detention_minutes: minutes_in(&definition.recidive),
        }
    }

    /// Whether the repeat-rate column prices this infraction.
    pub fn uses_repeat_amount(&self, is_repeat: bool) -> bool {
        is_repeat && self.repeat_amount != RateValue::NotApplicable
    }

    pub fn resolve(&self, is_repeat: bool) -> ResolvedRate {
        let amount = if self.uses_repeat_amount(is_repeat) {
            self.repeat_amount.numeric()
        } else {
            self.base_amount.numeric()
        };

        let points = match self.points {
            RateValue::Revoked => PointDeduction::Revoked,
            other => PointDeduction::Points(saturate(other.numeric())),
        };

        let repeat_detention = if is_repeat {
            self.repeat_detention_minutes
        } else {
            None
        };
        let detention_minutes = repeat_detention
            .or(self.detention_minutes)
            .unwrap_or(0);

        ResolvedRate {
            amount,
            points,
            detention_minutes,
        }
    }
}

/// Resolve one definition for a first-time or repeat offense. Never fails.
pub fn resolve(definition: &InfractionDefinition, is_repeat: bool) -> ResolvedRate {
    PenaltySchedule::from_definition(definition).resolve(is_repeat)
}

/// Text of the column that priced the infraction, for the citation summary.
pub(crate) fn applied_rate_text(definition: &InfractionDefinition, is_repeat: bool) -> &str {
    if is_repeat && !is_sentinel(&definition.recidive, &NO_RATE_SENTINELS) {
        &definition.recidive
    } else {
        &definition.montant
    }
}

fn is_sentinel(text: &str, sentinels: &[&str]) -> bool {
    let normalized = text.trim().to_lowercase();
    sentinels.iter().any(|sentinel| normalized == *sentinel)
}

fn first_number(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits = digit_run(&text[start..]);
    Some(digits_value(digits))
}

fn digit_run(text: &str) -> &str {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    &text[..end]
}

fn digits_value(digits: &str) -> u64 {
    digits.bytes().fold(0u64, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(u64::from(digit - b'0'))
    })
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// First `<quantity><minute unit>` pair in the text, e.g. `12 minutes`, `12min`.
pub(crate) fn minutes_in(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let mut rest = lower.as_str();

    while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
        let digits = digit_run(&rest[start..]);
        let after = &rest[start + digits.len()..];
        let unit = after.trim_start_matches([' ', '\u{a0}']);
        if starts_with_minute_unit(unit) {
            return Some(saturate(digits_value(digits)));
        }
        rest = after;
    }

    None
}

fn starts_with_minute_unit(text: &str) -> bool {
    MINUTE_UNITS.iter().any(|unit| {
        text.strip_prefix(unit)
            .map(|tail| !tail.chars().next().is_some_and(char::is_alphabetic))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(montant: &str, recidive: &str, points: &str, prison: &str) -> InfractionDefinition {
        InfractionDefinition {
            id: InfractionId(1),
            infraction: "Excès de vitesse".to_string(),
            categorie: "Infractions routières".to_string(),
            montant: montant.to_string(),
            recidive: recidive.to_string(),
            retrait_points: points.to_string(),
            prison: prison.to_string(),
            immobilisation: false,
            fourriere: false,
        }
    }

    #[test]
    fn minute_unit_spellings_all_parse() {
        for text in ["12 minutes", "12min", "12 min", "12 Minutes", "12mins", "12 MINUTE"] {
            assert_eq!(minutes_in(text), Some(12), "{text}");
        }
    }

    #[test]
    fn minutes_require_a_unit_token() {
        assert_eq!(minutes_in("Aucune"), None);
        assert_eq!(minutes_in("12"), None);
        assert_eq!(minutes_in("12 mois"), None);
        assert_eq!(minutes_in("12 minimum"), None);
        assert_eq!(minutes_in("2000$ + 15 minutes"), Some(15));
    }

    #[test]
    fn revocation_keyword_beats_digits() {
        assert_eq!(RateValue::parse_points("Suppression du permis"), RateValue::Revoked);
        assert_eq!(
            RateValue::parse_points("6 points + révocation du permis"),
            RateValue::Revoked
        );
        assert_eq!(RateValue::parse_points("REVOCATION"), RateValue::Revoked);
    }

    #[test]
    fn point_sentinels_are_not_applicable() {
        for text in ["Aucun", "Non applicable", "///", "  "] {
            assert_eq!(RateValue::parse_points(text), RateValue::NotApplicable, "{text}");
        }
        assert_eq!(RateValue::parse_points("3 points"), RateValue::Numeric(3));
    }

    #[test]
    fn amounts_take_first_digit_run_and_default_to_zero() {
        assert_eq!(RateValue::parse_amount("500$"), RateValue::Numeric(500));
        assert_eq!(RateValue::parse_amount("1000$ + 20 minutes"), RateValue::Numeric(1000));
        assert_eq!(RateValue::parse_amount("Non défini"), RateValue::Numeric(0));
        assert_eq!(RateValue::parse_amount("Non applicable"), RateValue::NotApplicable);
        assert_eq!(
            RateValue::parse_amount("99999999999999999999999$"),
            RateValue::Numeric(u64::MAX)
        );
    }

    #[test]
    fn repeat_rate_applies_only_when_defined() {
        let with_repeat = definition("500$", "1000$", "2 points", "Aucune");
        assert_eq!(resolve(&with_repeat, false).amount, 500);
        assert_eq!(resolve(&with_repeat, true).amount, 1000);

        let without_repeat = definition("500$", NOT_APPLICABLE, "2 points", "Aucune");
        assert_eq!(resolve(&without_repeat, true).amount, 500);
        assert_eq!(applied_rate_text(&without_repeat, true), "500$");
    }

    #[test]
    fn repeat_detention_overrides_base_detention() {
        let def = definition("1500$", "3000$ + 20 minutes", "Aucun", "10 minutes");
        assert_eq!(resolve(&def, false).detention_minutes, 10);
        assert_eq!(resolve(&def, true).detention_minutes, 20);

        let no_repeat_minutes = definition("1500$", "3000$", "Aucun", "10 minutes");
        assert_eq!(resolve(&no_repeat_minutes, true).detention_minutes, 10);
    }

    #[test]
    fn unparseable_text_resolves_to_zero() {
        let def = definition("Non défini", "Non applicable", "///", "Aucune");
        let resolved = resolve(&def, true);
        assert_eq!(
            resolved,
            ResolvedRate {
                amount: 0,
                points: PointDeduction::Points(0),
                detention_minutes: 0,
            }
        );
    }
}
