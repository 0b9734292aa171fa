use metrics_exporter_prometheus::PrometheusHandle;
use rapports::citations::{
    CatalogImportError, CatalogImporter, CatalogSnapshot, Citation, CitationFilter, CitationId,
    CitationService, CitationStatus, CitationStore, Citizen, CitizenDetails, CitizenId,
    CitizenStore, NewCitation, RepositoryError, StoredCitationHistory,
};
use rapports::config::CitationConfig;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type InMemoryCitationService = CitationService<
    CatalogSnapshot,
    StoredCitationHistory<InMemoryCitationStore>,
    InMemoryCitationStore,
    InMemoryCitizenStore,
>;

/// Citations keyed by identifier; identifiers are never reused, so reverse key
/// order is newest first.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCitationStore {
    records: Arc<Mutex<BTreeMap<CitationId, Citation>>>,
    last_id: Arc<AtomicU64>,
}

impl CitationStore for InMemoryCitationStore {
    fn create(&self, citation: NewCitation) -> Result<Citation, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let id = CitationId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        let stored = citation.into_citation(id);
        guard.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn fetch(&self, id: CitationId) -> Result<Option<Citation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn update_status(&self, id: CitationId, statut: CitationStatus) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&id) {
            Some(citation) => {
                citation.statut = statut;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete(&self, id: CitationId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list(&self, filter: &CitationFilter) -> Result<Vec<Citation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .rev()
            .filter(|citation| filter.matches(citation))
            .cloned()
            .collect())
    }
}

/// Citizens keyed by identifier; fresh identifiers continue after the highest one seen.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCitizenStore {
    records: Arc<Mutex<HashMap<CitizenId, Citizen>>>,
    last_id: Arc<AtomicU64>,
}

impl CitizenStore for InMemoryCitizenStore {
    fn insert(&self, mut citizen: Citizen) -> Result<Citizen, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&citizen.id) {
            return Err(RepositoryError::Conflict);
        }
        citizen.nom = citizen.nom.trim().to_uppercase();
        self.last_id.fetch_max(citizen.id.0, Ordering::SeqCst);
        guard.insert(citizen.id, citizen.clone());
        Ok(citizen)
    }

    fn create(&self, details: CitizenDetails) -> Result<Citizen, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let id = CitizenId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        let citizen = Citizen::from_details(id, details);
        guard.insert(id, citizen.clone());
        Ok(citizen)
    }

    fn update(&self, citizen: Citizen) -> Result<Citizen, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&citizen.id) {
            Some(stored) => {
                *stored = citizen.clone();
                Ok(citizen)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: CitizenId) -> Result<Option<Citizen>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn delete(&self, id: CitizenId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list(&self, limit: usize) -> Result<Vec<Citizen>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut citizens: Vec<Citizen> = guard.values().cloned().collect();
        citizens.sort_by(|a, b| (&a.nom, &a.prenom, a.id).cmp(&(&b.nom, &b.prenom, b.id)));
        citizens.truncate(limit);
        Ok(citizens)
    }
}

pub(crate) fn load_catalog(path: Option<&Path>) -> Result<CatalogSnapshot, CatalogImportError> {
    match path {
        Some(path) => CatalogImporter::from_path(path),
        None => CatalogImporter::sample(),
    }
}

pub(crate) fn build_citation_service(
    catalog: CatalogSnapshot,
    config: CitationConfig,
) -> (
    Arc<InMemoryCitationService>,
    Arc<InMemoryCitationStore>,
    Arc<InMemoryCitizenStore>,
) {
    let citations = Arc::new(InMemoryCitationStore::default());
    let citizens = Arc::new(InMemoryCitizenStore::default());
    let history = Arc::new(StoredCitationHistory::new(citations.clone()));
    let service = Arc::new(CitationService::new(
        Arc::new(catalog),
        history,
        citations.clone(),
        citizens.clone(),
        config,
    ));
    (service, citations, citizens)
}

pub(crate) fn sample_citizens() -> Vec<Citizen> {
    vec![
        Citizen {
            id: CitizenId(1),
            nom: "Durand".to_string(),
            prenom: "Alice".to_string(),
            date_naissance: chrono::NaiveDate::from_ymd_opt(1991, 4, 12),
            telephone: Some("555-0142".to_string()),
            adresse: Some("12 rue des Lilas".to_string()),
            notes: None,
        },
        Citizen {
            id: CitizenId(2),
            nom: "Martin".to_string(),
            prenom: "Luc".to_string(),
            date_naissance: chrono::NaiveDate::from_ymd_opt(1985, 11, 3),
            telephone: None,
            adresse: None,
            notes: Some("Suivi par la brigade nord".to_string()),
        },
    ]
}

pub(crate) fn seed_citizens(store: &InMemoryCitizenStore) -> Result<usize, RepositoryError> {
    let mut inserted = 0;
    for citizen in sample_citizens() {
        store.insert(citizen)?;
        inserted += 1;
    }
    Ok(inserted)
}
