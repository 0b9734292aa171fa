use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CitationConfig;

use super::catalog::{CatalogFilter, InfractionCatalog};
use super::domain::{
    Caller, Citation, CitationId, CitationStatus, Citizen, CitizenDetails, CitizenId, CitizenKey,
    InfractionDefinition, InfractionId, NewCitation, ValidationError,
};
use super::lifecycle::{CitationLifecycle, LifecycleError, Transition};
use super::penalty::{aggregate, classify, PenaltyAssessment};
use super::repository::{
    CitationFilter, CitationStore, CitizenHistoryProvider, CitizenStore, RepositoryError,
};
use super::stats::{CasierStats, CitizenRecord, OverviewStats};

/// What an agent submits when recording (or previewing) a citation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationDraft {
    pub citoyen_id: Option<CitizenId>,
    pub citoyen_nom: String,
    pub citoyen_prenom: String,
    /// Selected infractions in the order the agent picked them.
    pub amende_ids: Vec<InfractionId>,
    pub description: String,
    pub lieu: Option<String>,
    /// Operator's "treat as repeat" flag; `None` lets the service pick the default.
    pub est_recidive: Option<bool>,
}

impl CitationDraft {
    pub fn citizen_key(&self) -> Option<CitizenKey> {
        if let Some(id) = self.citoyen_id {
            return Some(CitizenKey::Id(id));
        }
        let nom = self.citoyen_nom.trim();
        let prenom = self.citoyen_prenom.trim();
        if nom.is_empty() || prenom.is_empty() {
            None
        } else {
            Some(CitizenKey::name(nom, prenom))
        }
    }

    fn has_citizen_names(&self) -> bool {
        !self.citoyen_nom.trim().is_empty() && !self.citoyen_prenom.trim().is_empty()
    }
}

/// Prior infractions of a citizen plus the recidivism hint derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitizenHistoryView {
    pub infractions: Vec<InfractionId>,
    pub suggest_recidive: bool,
}

/// Penalty assessment together with the recidivism flag that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationPreview {
    pub est_recidive: bool,
    pub montant_applique: Option<String>,
    pub assessment: PenaltyAssessment,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedCitation {
    pub citation: Citation,
    pub assessment: PenaltyAssessment,
}

/// Default number of citizens returned by a listing.
pub const DEFAULT_CITIZEN_LIMIT: usize = 50;

/// Service composing the fine schedule, citizen history, penalty engine and stores.
pub struct CitationService<C, H, S, Z> {
    catalog: Arc<C>,
    history: Arc<H>,
    store: Arc<S>,
    citizens: Arc<Z>,
    config: CitationConfig,
    /// Held while creating citations and while changing citizens, so a citizen
    /// cannot disappear between the reference count and the delete.
    writes: Mutex<()>,
}

impl<C, H, S, Z> CitationService<C, H, S, Z>
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    pub fn new(
        catalog: Arc<C>,
        history: Arc<H>,
        store: Arc<S>,
        citizens: Arc<Z>,
        config: CitationConfig,
    ) -> Self {
        Self {
            catalog,
            history,
            store,
            citizens,
            config,
            writes: Mutex::new(()),
        }
    }

    pub fn catalog(
        &self,
        filter: &CatalogFilter,
    ) -> Result<Vec<InfractionDefinition>, CitationServiceError> {
        Ok(self.catalog.list(filter)?)
    }

    pub fn categories(&self) -> Result<Vec<String>, CitationServiceError> {
        let categories: BTreeSet<String> = self
            .catalog
            .list(&CatalogFilter::default())?
            .into_iter()
            .map(|definition| definition.categorie)
            .collect();
        Ok(categories.into_iter().collect())
    }

    pub fn history(&self, key: &CitizenKey) -> Result<CitizenHistoryView, CitationServiceError> {
        let infractions = self.history.history_for(key)?;
        Ok(CitizenHistoryView {
            suggest_recidive: !infractions.is_empty(),
            infractions: infractions.into_iter().collect(),
        })
    }

    /// Price a draft without persisting anything.
    pub fn preview(&self, draft: &CitationDraft) -> Result<CitationPreview, CitationServiceError> {
        let history = match draft.citizen_key() {
            Some(key) => self.history.history_for(&key)?,
            None => BTreeSet::new(),
        };
        assess_draft(
            self.catalog.as_ref(),
            draft,
            &history,
            self.config.history_defaults_recidive,
        )
    }

    /// Assess and persist a citation; nothing is stored unless assessment succeeds.
    pub fn record(
        &self,
        caller: &Caller,
        draft: CitationDraft,
    ) -> Result<RecordedCitation, CitationServiceError> {
        if !draft.has_citizen_names() {
            return Err(ValidationError::MissingCitizenName.into());
        }

        let preview = self.preview(&draft)?;
        let new_citation = NewCitation {
            agent_id: caller.id,
            citoyen_id: draft.citoyen_id,
            citoyen_nom: draft.citoyen_nom.trim().to_string(),
            citoyen_prenom: draft.citoyen_prenom.trim().to_string(),
            amende_id: preview.assessment.lines.first().map(|line| line.id),
            montant_applique: preview.montant_applique,
            description: preview.description,
            lieu: draft.lieu.filter(|lieu| !lieu.trim().is_empty()),
            est_recidive: preview.est_recidive,
            date_creation: Utc::now(),
        };

        let citation = {
            let _writes = self.lock_writes();
            if let Some(id) = new_citation.citoyen_id {
                if self.citizens.fetch(id)?.is_none() {
                    return Err(ValidationError::UnknownCitizen(id).into());
                }
            }
            self.store.create(new_citation)?
        };
        info!(
            citation_id = %citation.id,
            agent_id = %caller.id,
            infractions = preview.assessment.lines.len(),
            est_recidive = citation.est_recidive,
            "citation recorded"
        );

        Ok(RecordedCitation {
            citation,
            assessment: preview.assessment,
        })
    }

    pub fn get(&self, id: CitationId) -> Result<Citation, CitationServiceError> {
        let citation = self.store.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(citation)
    }

    pub fn list(&self, filter: &CitationFilter) -> Result<Vec<Citation>, CitationServiceError> {
        Ok(self.store.list(filter)?)
    }

    /// Apply a status change requested with the raw `statut` label.
    pub fn set_status(
        &self,
        caller: &Caller,
        id: CitationId,
        statut: &str,
    ) -> Result<Citation, CitationServiceError> {
        let target = CitationStatus::from_label(statut)?;
        let mut citation = self.get(id)?;

        match CitationLifecycle::transition(&citation, caller, target) {
            Ok(Transition::Applied { from, to }) => {
                self.store.update_status(id, to)?;
                info!(citation_id = %id, agent_id = %caller.id, %from, %to, "statut updated");
                citation.statut = to;
                Ok(citation)
            }
            Ok(Transition::Unchanged(_)) => Ok(citation),
            Err(err) => {
                warn!(citation_id = %id, agent_id = %caller.id, error = %err, "statut change refused");
                Err(err.into())
            }
        }
    }

    pub fn delete(&self, caller: &Caller, id: CitationId) -> Result<(), CitationServiceError> {
        if let Err(err) = CitationLifecycle::authorize_deletion(caller) {
            warn!(citation_id = %id, agent_id = %caller.id, error = %err, "deletion refused");
            return Err(err.into());
        }
        self.store.delete(id)?;
        info!(citation_id = %id, agent_id = %caller.id, "citation deleted");
        Ok(())
    }

    /// Delete a citizen unless citations still reference them, by id or by name pair.
    pub fn delete_citizen(
        &self,
        caller: &Caller,
        id: CitizenId,
    ) -> Result<(), CitationServiceError> {
        let _writes = self.lock_writes();
        let citizen = self.citizens.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        let referencing = self.store.count_matching(&citizen.key())?;
        if let Err(err) = CitationLifecycle::authorize_citizen_deletion(caller, id, referencing) {
            warn!(citizen_id = %id, agent_id = %caller.id, error = %err, "citizen deletion refused");
            return Err(err.into());
        }
        self.citizens.delete(id)?;
        info!(citizen_id = %id, agent_id = %caller.id, "citizen deleted");
        Ok(())
    }

    pub fn citizens(&self, limit: Option<usize>) -> Result<Vec<Citizen>, CitationServiceError> {
        Ok(self
            .citizens
            .list(limit.unwrap_or(DEFAULT_CITIZEN_LIMIT))?)
    }

    pub fn create_citizen(
        &self,
        caller: &Caller,
        details: CitizenDetails,
    ) -> Result<Citizen, CitationServiceError> {
        let details = details.normalized()?;
        let citizen = {
            let _writes = self.lock_writes();
            self.citizens.create(details)?
        };
        info!(citizen_id = %citizen.id, agent_id = %caller.id, "citizen created");
        Ok(citizen)
    }

    pub fn update_citizen(
        &self,
        caller: &Caller,
        id: CitizenId,
        details: CitizenDetails,
    ) -> Result<Citizen, CitationServiceError> {
        let details = details.normalized()?;
        let citizen = {
            let _writes = self.lock_writes();
            if self.citizens.fetch(id)?.is_none() {
                return Err(RepositoryError::NotFound.into());
            }
            self.citizens.update(Citizen::from_details(id, details))?
        };
        info!(citizen_id = %id, agent_id = %caller.id, "citizen updated");
        Ok(citizen)
    }

    /// Citizen card with every citation referring to them.
    pub fn casier(&self, id: CitizenId) -> Result<CitizenRecord, CitationServiceError> {
        let citizen = self.citizens.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        let rapports = self.store.list(&CitationFilter::for_citizen(citizen.key()))?;
        let stats = CasierStats::from_citations(&rapports);
        Ok(CitizenRecord {
            citizen,
            rapports,
            stats,
        })
    }

    pub fn overview(
        &self,
        caller: &Caller,
        today: NaiveDate,
    ) -> Result<OverviewStats, CitationServiceError> {
        let citations = self.store.list(&CitationFilter::default())?;
        Ok(OverviewStats::compute(&citations, caller.id, today))
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Price a draft against a known citizen history.
///
/// Without an operator flag, a non-empty history pre-sets repeat pricing when
/// `history_defaults_recidive` is on.
pub fn assess_draft<C>(
    catalog: &C,
    draft: &CitationDraft,
    history: &BTreeSet<InfractionId>,
    history_defaults_recidive: bool,
) -> Result<CitationPreview, CitationServiceError>
where
    C: InfractionCatalog + ?Sized,
{
    let selected = resolve_selection(catalog, &draft.amende_ids)?;
    let global_repeat = draft
        .est_recidive
        .unwrap_or(history_defaults_recidive && !history.is_empty());

    let ids: Vec<InfractionId> = selected.iter().map(|definition| definition.id).collect();
    let repeat_map = classify(&ids, history, global_repeat);
    let assessment = aggregate(&selected, &repeat_map);

    debug!(
        selected = ids.len(),
        prior_infractions = history.len(),
        global_repeat,
        amount = assessment.totals.amount,
        "penalties assessed"
    );

    Ok(CitationPreview {
        est_recidive: global_repeat || assessment.any_repeat(),
        montant_applique: assessment.totals.montant_applique(),
        description: assessment.description(&draft.description),
        assessment,
    })
}

// Unknown identifiers fail the whole draft; repeated picks count once.
fn resolve_selection<C>(
    catalog: &C,
    ids: &[InfractionId],
) -> Result<Vec<InfractionDefinition>, CitationServiceError>
where
    C: InfractionCatalog + ?Sized,
{
    let mut seen = BTreeSet::new();
    let mut selected = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            continue;
        }
        let definition = catalog
            .get(*id)?
            .ok_or(ValidationError::UnknownInfraction(*id))?;
        selected.push(definition);
    }
    Ok(selected)
}

/// Error raised by the citation service.
#[derive(Debug, thiserror::Error)]
pub enum CitationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
