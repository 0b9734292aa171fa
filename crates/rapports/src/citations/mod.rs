//! Citation recording: fine schedule lookup, recidivism-aware penalty assessment,
//! status lifecycle and citizen records.

pub mod catalog;
pub mod domain;
pub mod lifecycle;
pub mod penalty;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;

#[cfg(test)]
mod tests;

pub use catalog::{
    CatalogFilter, CatalogImportError, CatalogImporter, CatalogSnapshot, InfractionCatalog,
    SAMPLE_SCHEDULE_CSV,
};
pub use domain::{
    AgentId, Caller, CallerRole, Citation, CitationId, CitationStatus, Citizen, CitizenDetails,
    CitizenId, CitizenKey, InfractionDefinition, InfractionId, NewCitation, ValidationError,
};
pub use lifecycle::{CitationLifecycle, LifecycleAction, LifecycleError, Transition};
pub use penalty::{PenaltyAssessment, PenaltyTotals, PointsOutcome};
pub use repository::{
    CitationFilter, CitationStore, CitizenHistoryProvider, CitizenStore, RepositoryError,
    StoredCitationHistory,
};
pub use router::{citation_router, AGENT_ID_HEADER, AGENT_ROLE_HEADER};
pub use service::{
    assess_draft, CitationDraft, CitationPreview, CitationService, CitationServiceError,
    CitizenHistoryView, RecordedCitation, DEFAULT_CITIZEN_LIMIT,
};
pub use stats::{CasierStats, CitizenRecord, OverviewStats};
