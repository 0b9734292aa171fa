use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::domain::{AgentId, Citation, CitationStatus, Citizen};

/// Per-citizen counters shown alongside the casier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CasierStats {
    pub total_rapports: usize,
    pub total_amendes: u64,
    pub rapports_en_cours: usize,
    pub rapports_payes: usize,
}

impl CasierStats {
    pub fn from_citations(citations: &[Citation]) -> Self {
        let mut stats = Self {
            total_rapports: citations.len(),
            ..Self::default()
        };

        for citation in citations {
            let amount = citation
                .montant_applique
                .as_deref()
                .map(amount_digits)
                .unwrap_or(0);
            stats.total_amendes = stats.total_amendes.saturating_add(amount);
            match citation.statut {
                CitationStatus::EnCours => stats.rapports_en_cours += 1,
                CitationStatus::Paye => stats.rapports_payes += 1,
                CitationStatus::Valide | CitationStatus::Rejete => {}
            }
        }

        stats
    }
}

/// Citizen card with every citation recorded against them, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitizenRecord {
    #[serde(flatten)]
    pub citizen: Citizen,
    pub rapports: Vec<Citation>,
    pub stats: CasierStats,
}

/// Dashboard counters across all citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_rapports: usize,
    pub rapports_en_cours: usize,
    pub rapports_payes: usize,
    pub rapports_mois: usize,
    pub mes_rapports: usize,
}

impl OverviewStats {
    pub fn compute(citations: &[Citation], agent: AgentId, today: NaiveDate) -> Self {
        citations.iter().fold(
            Self {
                total_rapports: citations.len(),
                ..Self::default()
            },
            |mut stats, citation| {
                match citation.statut {
                    CitationStatus::EnCours => stats.rapports_en_cours += 1,
                    CitationStatus::Paye => stats.rapports_payes += 1,
                    CitationStatus::Valide | CitationStatus::Rejete => {}
                }
                let created = citation.date_creation.date_naive();
                if created.year() == today.year() && created.month() == today.month() {
                    stats.rapports_mois += 1;
                }
                if citation.agent_id == agent {
                    stats.mes_rapports += 1;
                }
                stats
            },
        )
    }
}

// Stored amounts are free text ("1500$"); every digit counts.
fn amount_digits(text: &str) -> u64 {
    text.bytes()
        .filter(u8::is_ascii_digit)
        .fold(0u64, |acc, digit| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(digit - b'0'))
        })
}
