use std::collections::BTreeMap;

use serde::Serialize;

use super::super::domain::{InfractionDefinition, InfractionId};
use super::rates::{applied_rate_text, PenaltySchedule, PointDeduction, ResolvedRate};

const SUMMARY_HEADER: &str = "INFRACTIONS COMMISES:";
const REPEAT_MARKER: &str = "[RÉCIDIVE]";
const REVOKED_LABEL: &str = "SUPPRESSION DU PERMIS";

/// Citation-level point outcome; a revocation absorbs any point subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsOutcome {
    Deducted(u32),
    Revoked,
}

impl PointsOutcome {
    pub fn label(self) -> String {
        match self {
            PointsOutcome::Deducted(points) => points.to_string(),
            PointsOutcome::Revoked => REVOKED_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PenaltyTotals {
    pub amount: u64,
    pub points: PointsOutcome,
    pub detention_minutes: u32,
}

impl Default for PenaltyTotals {
    fn default() -> Self {
        Self {
            amount: 0,
            points: PointsOutcome::Deducted(0),
            detention_minutes: 0,
        }
    }
}

impl PenaltyTotals {
    /// Persisted `montant_applique` text; absent when nothing is owed.
    pub fn montant_applique(&self) -> Option<String> {
        (self.amount > 0).then(|| format!("{}$", self.amount))
    }
}

/// One selected infraction with its classification and resolved penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessedInfraction {
    pub id: InfractionId,
    pub infraction: String,
    pub is_repeat: bool,
    pub applied_rate: String,
    pub resolved: ResolvedRate,
}

impl AssessedInfraction {
    fn summary_line(&self) -> String {
        let mut line = format!("- {} ({})", self.infraction, self.applied_rate);
        if self.is_repeat {
            line.push(' ');
            line.push_str(REPEAT_MARKER);
        }
        line
    }
}

/// Aggregated penalties for a citation, in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PenaltyAssessment {
    pub lines: Vec<AssessedInfraction>,
    pub totals: PenaltyTotals,
}

impl PenaltyAssessment {
    pub fn any_repeat(&self) -> bool {
        self.lines.iter().any(|line| line.is_repeat)
    }

    /// Infractions block followed by the totals; `None` for an empty selection.
    pub fn summary(&self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }

        let mut summary = String::from(SUMMARY_HEADER);
        for line in &self.lines {
            summary.push('\n');
            summary.push_str(&line.summary_line());
        }

        summary.push_str(&format!(
            "\n\nTOTAL AMENDE: {}$\nRETRAIT DE POINTS: {}\nDÉTENTION: {} minutes",
            self.totals.amount,
            self.totals.points.label(),
            self.totals.detention_minutes
        ));

        Some(summary)
    }

    /// Text persisted as the citation description.
    pub fn description(&self, operator_text: &str) -> String {
        let operator_text = operator_text.trim();
        match self.summary() {
            Some(summary) if operator_text.is_empty() => summary,
            Some(summary) => format!("{summary}\n\n{operator_text}"),
            None => operator_text.to_string(),
        }
    }
}

/// Sum the penalties of the selected definitions under their repeat classification.
///
/// Definitions missing from `repeat_map` are priced as first offenses.
pub fn aggregate(
    selected: &[InfractionDefinition],
    repeat_map: &BTreeMap<InfractionId, bool>,
) -> PenaltyAssessment {
    let mut lines = Vec::with_capacity(selected.len());
    let mut amount: u64 = 0;
    let mut points: u32 = 0;
    let mut detention_minutes: u32 = 0;
    let mut revoked = false;

    for definition in selected {
        let is_repeat = repeat_map.get(&definition.id).copied().unwrap_or(false);
        let resolved = PenaltySchedule::from_definition(definition).resolve(is_repeat);

        amount = amount.saturating_add(resolved.amount);
        detention_minutes = detention_minutes.saturating_add(resolved.detention_minutes);
        match resolved.points {
            PointDeduction::Points(value) => points = points.saturating_add(value),
            PointDeduction::Revoked => revoked = true,
        }

        lines.push(AssessedInfraction {
            id: definition.id,
            infraction: definition.infraction.clone(),
            is_repeat,
            applied_rate: applied_rate_text(definition, is_repeat).trim().to_string(),
            resolved,
        });
    }

    let points = if revoked {
        PointsOutcome::Revoked
    } else {
        PointsOutcome::Deducted(points)
    };

    PenaltyAssessment {
        lines,
        totals: PenaltyTotals {
            amount,
            points,
            detention_minutes,
        },
    }
}
