use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a fine schedule entry ("amende").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InfractionId(pub u32);

/// Identifier of a recorded citation ("rapport").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CitationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CitizenId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for InfractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CitizenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog entry describing an offense and its penalties, as free text.
///
/// The textual fields keep whatever the fine schedule export contained; they are
/// interpreted by [`crate::citations::penalty::PenaltySchedule::from_definition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfractionDefinition {
    pub id: InfractionId,
    pub infraction: String,
    pub categorie: String,
    pub montant: String,
    pub recidive: String,
    pub retrait_points: String,
    pub prison: String,
    pub immobilisation: bool,
    pub fourriere: bool,
}

/// How a citizen is identified when looking up prior citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitizenKey {
    Id(CitizenId),
    Name { nom: String, prenom: String },
    /// A stored citizen: matches citations linked by id or carrying the same name pair.
    Record {
        id: CitizenId,
        nom: String,
        prenom: String,
    },
}

impl CitizenKey {
    pub fn name(nom: impl Into<String>, prenom: impl Into<String>) -> Self {
        CitizenKey::Name {
            nom: nom.into(),
            prenom: prenom.into(),
        }
    }

    /// Match a stored citation against this key.
    ///
    /// Identifier keys only match citations carrying the same citizen id; name keys
    /// compare both names case-insensitively after trimming. Record keys accept either.
    pub fn matches(&self, citation: &Citation) -> bool {
        match self {
            CitizenKey::Id(id) => citation.citoyen_id == Some(*id),
            CitizenKey::Name { nom, prenom } => {
                same_name(nom, &citation.citoyen_nom) && same_name(prenom, &citation.citoyen_prenom)
            }
            CitizenKey::Record { id, nom, prenom } => {
                citation.citoyen_id == Some(*id)
                    || (same_name(nom, &citation.citoyen_nom)
                        && same_name(prenom, &citation.citoyen_prenom))
            }
        }
    }
}

fn same_name(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// Lifecycle status of a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CitationStatus {
    #[serde(rename = "En cours")]
    EnCours,
    #[serde(rename = "Validé")]
    Valide,
    #[serde(rename = "Rejeté")]
    Rejete,
    #[serde(rename = "Payé")]
    Paye,
}

impl CitationStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::EnCours, Self::Valide, Self::Rejete, Self::Paye]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::EnCours => "En cours",
            Self::Valide => "Validé",
            Self::Rejete => "Rejeté",
            Self::Paye => "Payé",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::EnCours)
    }

    pub fn from_label(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|status| status.label() == trimmed)
            .ok_or_else(|| ValidationError::UnknownStatus(raw.to_string()))
    }
}

impl fmt::Display for CitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted citation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: CitationId,
    pub agent_id: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citoyen_id: Option<CitizenId>,
    pub citoyen_nom: String,
    pub citoyen_prenom: String,
    /// Only the first selected infraction is kept as a structured reference.
    pub amende_id: Option<InfractionId>,
    pub montant_applique: Option<String>,
    pub description: String,
    pub lieu: Option<String>,
    pub est_recidive: bool,
    pub statut: CitationStatus,
    pub date_creation: DateTime<Utc>,
}

/// Citation content before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCitation {
    pub agent_id: AgentId,
    pub citoyen_id: Option<CitizenId>,
    pub citoyen_nom: String,
    pub citoyen_prenom: String,
    pub amende_id: Option<InfractionId>,
    pub montant_applique: Option<String>,
    pub description: String,
    pub lieu: Option<String>,
    pub est_recidive: bool,
    pub date_creation: DateTime<Utc>,
}

impl NewCitation {
    pub fn into_citation(self, id: CitationId) -> Citation {
        Citation {
            id,
            agent_id: self.agent_id,
            citoyen_id: self.citoyen_id,
            citoyen_nom: self.citoyen_nom,
            citoyen_prenom: self.citoyen_prenom,
            amende_id: self.amende_id,
            montant_applique: self.montant_applique,
            description: self.description,
            lieu: self.lieu,
            est_recidive: self.est_recidive,
            statut: CitationStatus::EnCours,
            date_creation: self.date_creation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: CitizenId,
    pub nom: String,
    pub prenom: String,
    #[serde(default)]
    pub date_naissance: Option<NaiveDate>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub adresse: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Citizen {
    pub fn from_details(id: CitizenId, details: CitizenDetails) -> Self {
        Self {
            id,
            nom: details.nom,
            prenom: details.prenom,
            date_naissance: details.date_naissance,
            telephone: details.telephone,
            adresse: details.adresse,
            notes: details.notes,
        }
    }

    /// Key matching every citation that refers to this citizen.
    pub fn key(&self) -> CitizenKey {
        CitizenKey::Record {
            id: self.id,
            nom: self.nom.clone(),
            prenom: self.prenom.clone(),
        }
    }
}

/// Editable citizen fields, as sent on creation and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CitizenDetails {
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub prenom: String,
    #[serde(default)]
    pub date_naissance: Option<NaiveDate>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub adresse: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CitizenDetails {
    /// Require both names; `nom` is stored upper-case.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let nom = self.nom.trim().to_uppercase();
        let prenom = self.prenom.trim().to_string();
        if nom.is_empty() || prenom.is_empty() {
            return Err(ValidationError::MissingCitizenName);
        }
        Ok(Self {
            nom,
            prenom,
            ..self
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Agent,
    Admin,
}

impl CallerRole {
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "agent" => Some(Self::Agent),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The agent performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: AgentId,
    pub role: CallerRole,
}

impl Caller {
    pub fn agent(id: u64) -> Self {
        Self {
            id: AgentId(id),
            role: CallerRole::Agent,
        }
    }

    pub fn admin(id: u64) -> Self {
        Self {
            id: AgentId(id),
            role: CallerRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == CallerRole::Admin
    }
}

/// Input validation failures surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown statut '{0}' (expected En cours, Validé, Rejeté or Payé)")]
    UnknownStatus(String),
    #[error("citizen last name and first name are required")]
    MissingCitizenName,
    #[error("infraction {0} is not in the fine schedule")]
    UnknownInfraction(InfractionId),
    #[error("citizen {0} does not exist")]
    UnknownCitizen(CitizenId),
}
