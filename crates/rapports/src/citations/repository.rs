use std::collections::BTreeSet;
use std::sync::Arc;

use super::domain::{
    AgentId, Citation, CitationId, CitationStatus, Citizen, CitizenDetails, CitizenId,
    CitizenKey, InfractionId, NewCitation,
};

/// Storage abstraction for citations so the service can be exercised in isolation.
///
/// Stores persist what they are given; authorization and status rules live in
/// [`super::lifecycle`].
pub trait CitationStore: Send + Sync {
    fn create(&self, citation: NewCitation) -> Result<Citation, RepositoryError>;
    fn fetch(&self, id: CitationId) -> Result<Option<Citation>, RepositoryError>;
    fn update_status(&self, id: CitationId, statut: CitationStatus) -> Result<(), RepositoryError>;
    fn delete(&self, id: CitationId) -> Result<(), RepositoryError>;
    /// Matching citations, newest first.
    fn list(&self, filter: &CitationFilter) -> Result<Vec<Citation>, RepositoryError>;

    fn count_matching(&self, key: &CitizenKey) -> Result<usize, RepositoryError> {
        Ok(self.list(&CitationFilter::for_citizen(key.clone()))?.len())
    }
}

pub trait CitizenStore: Send + Sync {
    /// Store a citizen under its own identifier; `Conflict` when taken.
    fn insert(&self, citizen: Citizen) -> Result<Citizen, RepositoryError>;
    /// Store a new citizen under a fresh identifier.
    fn create(&self, details: CitizenDetails) -> Result<Citizen, RepositoryError>;
    /// Replace a stored citizen; `NotFound` when absent.
    fn update(&self, citizen: Citizen) -> Result<Citizen, RepositoryError>;
    fn fetch(&self, id: CitizenId) -> Result<Option<Citizen>, RepositoryError>;
    fn delete(&self, id: CitizenId) -> Result<(), RepositoryError>;
    /// At most `limit` citizens ordered by name.
    fn list(&self, limit: usize) -> Result<Vec<Citizen>, RepositoryError>;
}

/// Prior infractions cited against one citizen.
pub trait CitizenHistoryProvider: Send + Sync {
    fn history_for(&self, key: &CitizenKey) -> Result<BTreeSet<InfractionId>, RepositoryError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationFilter {
    pub statut: Option<CitationStatus>,
    pub agent_id: Option<AgentId>,
    pub citizen: Option<CitizenKey>,
}

impl CitationFilter {
    pub fn for_citizen(key: CitizenKey) -> Self {
        Self {
            citizen: Some(key),
            ..Self::default()
        }
    }

    pub fn matches(&self, citation: &Citation) -> bool {
        self.statut.map_or(true, |statut| citation.statut == statut)
            && self
                .agent_id
                .map_or(true, |agent| citation.agent_id == agent)
            && self
                .citizen
                .as_ref()
                .map_or(true, |key| key.matches(citation))
    }
}

/// History derived from the structured `amende_id` of past citations.
///
/// Only the primary infraction of each citation is visible here; the others exist
/// solely in the generated description.
pub struct StoredCitationHistory<S> {
    store: Arc<S>,
}

impl<S> StoredCitationHistory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> CitizenHistoryProvider for StoredCitationHistory<S>
where
    S: CitationStore,
{
    fn history_for(&self, key: &CitizenKey) -> Result<BTreeSet<InfractionId>, RepositoryError> {
        let citations = self.store.list(&CitationFilter::for_citizen(key.clone()))?;
        Ok(citations
            .into_iter()
            .filter_map(|citation| citation.amende_id)
            .collect())
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
