//! Fine schedule ("amendes") lookup and import.

mod normalizer;
mod parser;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{InfractionDefinition, InfractionId};
use super::repository::RepositoryError;

/// Sample fine schedule shipped with the crate, in the export's column layout.
pub const SAMPLE_SCHEDULE_CSV: &str = include_str!("../../../data/amendes_sample.csv");

/// Read-only lookup of infraction definitions.
pub trait InfractionCatalog: Send + Sync {
    fn get(&self, id: InfractionId) -> Result<Option<InfractionDefinition>, RepositoryError>;
    fn list(&self, filter: &CatalogFilter) -> Result<Vec<InfractionDefinition>, RepositoryError>;
}

/// Listing filter; `categorie = "all"` behaves like no category filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogFilter {
    #[serde(default)]
    pub categorie: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl CatalogFilter {
    pub fn matches(&self, definition: &InfractionDefinition) -> bool {
        let category_ok = match self.categorie.as_deref().map(str::trim) {
            None | Some("") | Some("all") => true,
            Some(category) => definition.categorie == category,
        };
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => definition
                .infraction
                .to_lowercase()
                .contains(&term.to_lowercase()),
        };
        category_ok && search_ok
    }
}

/// Immutable in-memory fine schedule.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    definitions: BTreeMap<InfractionId, InfractionDefinition>,
}

impl CatalogSnapshot {
    pub fn new(definitions: impl IntoIterator<Item = InfractionDefinition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|definition| (definition.id, definition))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Sorted, de-duplicated category names.
    pub fn categories(&self) -> Vec<String> {
        self.definitions
            .values()
            .map(|definition| definition.categorie.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl InfractionCatalog for CatalogSnapshot {
    fn get(&self, id: InfractionId) -> Result<Option<InfractionDefinition>, RepositoryError> {
        Ok(self.definitions.get(&id).cloned())
    }

    fn list(&self, filter: &CatalogFilter) -> Result<Vec<InfractionDefinition>, RepositoryError> {
        let mut definitions: Vec<_> = self
            .definitions
            .values()
            .filter(|definition| filter.matches(definition))
            .cloned()
            .collect();
        definitions.sort_by(|left, right| left.infraction.cmp(&right.infraction));
        Ok(definitions)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogImportError {
    #[error("failed to read fine schedule: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fine schedule CSV data: {0}")]
    Csv(#[from] csv::Error),
}

pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<CatalogSnapshot, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<CatalogSnapshot, CatalogImportError> {
        let definitions = parser::parse_definitions(reader)?;
        Ok(CatalogSnapshot::new(definitions))
    }

    pub fn sample() -> Result<CatalogSnapshot, CatalogImportError> {
        Self::from_reader(SAMPLE_SCHEDULE_CSV.as_bytes())
    }
}
