use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::citations::catalog::{CatalogImporter, CatalogSnapshot};
use crate::citations::domain::{
    Citation, CitationId, CitationStatus, Citizen, CitizenDetails, CitizenId, CitizenKey,
    InfractionId, NewCitation,
};
use crate::citations::repository::{
    CitationFilter, CitationStore, CitizenHistoryProvider, CitizenStore, RepositoryError,
    StoredCitationHistory,
};
use crate::citations::router::{citation_router, AGENT_ID_HEADER, AGENT_ROLE_HEADER};
use crate::citations::service::{CitationDraft, CitationService};
use crate::config::CitationConfig;

pub(super) type MemoryService = CitationService<
    CatalogSnapshot,
    StoredCitationHistory<MemoryCitations>,
    MemoryCitations,
    MemoryCitizens,
>;

pub(super) fn catalog() -> CatalogSnapshot {
    CatalogImporter::sample().expect("sample schedule parses")
}

pub(super) fn build_service() -> (MemoryService, Arc<MemoryCitations>, Arc<MemoryCitizens>) {
    build_service_with(CitationConfig::default())
}

pub(super) fn build_service_with(
    config: CitationConfig,
) -> (MemoryService, Arc<MemoryCitations>, Arc<MemoryCitizens>) {
    let citations = Arc::new(MemoryCitations::default());
    let citizens = Arc::new(MemoryCitizens::default());
    let history = Arc::new(StoredCitationHistory::new(citations.clone()));
    let service = CitationService::new(
        Arc::new(catalog()),
        history,
        citations.clone(),
        citizens.clone(),
        config,
    );
    (service, citations, citizens)
}

pub(super) fn draft(ids: &[u32]) -> CitationDraft {
    CitationDraft {
        citoyen_id: None,
        citoyen_nom: "DUPONT".to_string(),
        citoyen_prenom: "Jean".to_string(),
        amende_ids: ids.iter().copied().map(InfractionId).collect(),
        description: String::new(),
        lieu: Some("Boulevard central".to_string()),
        est_recidive: None,
    }
}

pub(super) fn citizen(id: u64) -> Citizen {
    named_citizen(id, "DUPONT", "Jean")
}

pub(super) fn named_citizen(id: u64, nom: &str, prenom: &str) -> Citizen {
    Citizen {
        id: CitizenId(id),
        nom: nom.to_string(),
        prenom: prenom.to_string(),
        date_naissance: None,
        telephone: Some("555-0101".to_string()),
        adresse: None,
        notes: None,
    }
}

#[derive(Default)]
pub(super) struct MemoryCitations {
    records: Mutex<Vec<Citation>>,
}

impl MemoryCitations {
    pub(super) fn snapshot(&self) -> Vec<Citation> {
        self.records.lock().expect("repository mutex poisoned").clone()
    }

    pub(super) fn insert_with_status(&self, citation: NewCitation, statut: CitationStatus) -> Citation {
        let mut stored = self.create(citation).expect("memory insert");
        self.update_status(stored.id, statut).expect("memory update");
        stored.statut = statut;
        stored
    }
}

impl CitationStore for MemoryCitations {
    fn create(&self, citation: NewCitation) -> Result<Citation, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let id = CitationId(guard.iter().map(|citation| citation.id.0).max().unwrap_or(0) + 1);
        let stored = citation.into_citation(id);
        guard.push(stored.clone());
        Ok(stored)
    }

    fn fetch(&self, id: CitationId) -> Result<Option<Citation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|citation| citation.id == id).cloned())
    }

    fn update_status(&self, id: CitationId, statut: CitationStatus) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let citation = guard
            .iter_mut()
            .find(|citation| citation.id == id)
            .ok_or(RepositoryError::NotFound)?;
        citation.statut = statut;
        Ok(())
    }

    fn delete(&self, id: CitationId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|citation| citation.id != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn list(&self, filter: &CitationFilter) -> Result<Vec<Citation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .filter(|citation| filter.matches(citation))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryCitizens {
    records: Mutex<HashMap<CitizenId, Citizen>>,
}

impl MemoryCitizens {
    pub(super) fn contains(&self, id: CitizenId) -> bool {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .contains_key(&id)
    }
}

impl CitizenStore for MemoryCitizens {
    fn insert(&self, citizen: Citizen) -> Result<Citizen, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&citizen.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(citizen.id, citizen.clone());
        Ok(citizen)
    }

    fn create(&self, details: CitizenDetails) -> Result<Citizen, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let id = CitizenId(guard.keys().map(|id| id.0).max().unwrap_or(0) + 1);
        let citizen = Citizen::from_details(id, details);
        guard.insert(id, citizen.clone());
        Ok(citizen)
    }

    fn update(&self, citizen: Citizen) -> Result<Citizen, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let slot = guard.get_mut(&citizen.id).ok_or(RepositoryError::NotFound)?;
        *slot = citizen.clone();
        Ok(citizen)
    }

    fn fetch(&self, id: CitizenId) -> Result<Option<Citizen>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn delete(&self, id: CitizenId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(&id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn list(&self, limit: usize) -> Result<Vec<Citizen>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut citizens: Vec<Citizen> = guard.values().cloned().collect();
        citizens.sort_by(|a, b| (&a.nom, &a.prenom, a.id).cmp(&(&b.nom, &b.prenom, b.id)));
        citizens.truncate(limit);
        Ok(citizens)
    }
}

/// History source that always fails, to check nothing is persisted.
pub(super) struct UnavailableHistory;

impl CitizenHistoryProvider for UnavailableHistory {
    fn history_for(&self, _key: &CitizenKey) -> Result<BTreeSet<InfractionId>, RepositoryError> {
        Err(RepositoryError::Unavailable("history offline".to_string()))
    }
}

pub(super) fn prior_citation(amende: u32, citoyen_id: Option<u64>) -> NewCitation {
    NewCitation {
        agent_id: crate::citations::domain::AgentId(2),
        citoyen_id: citoyen_id.map(CitizenId),
        citoyen_nom: "Dupont".to_string(),
        citoyen_prenom: "jean".to_string(),
        amende_id: Some(InfractionId(amende)),
        montant_applique: Some("500$".to_string()),
        description: String::new(),
        lieu: None,
        est_recidive: false,
        date_creation: Utc::now(),
    }
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    citation_router(Arc::new(service))
}

pub(super) fn request(method: Method, uri: &str, caller: Option<(u64, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder
            .header(AGENT_ID_HEADER, id.to_string())
            .header(AGENT_ROLE_HEADER, role);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
