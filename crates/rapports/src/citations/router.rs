use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::catalog::{CatalogFilter, InfractionCatalog};
use super::domain::{
    AgentId, Caller, CallerRole, CitationId, CitationStatus, CitizenDetails, CitizenId, CitizenKey,
    InfractionId, ValidationError,
};
use super::lifecycle::LifecycleError;
use super::repository::{
    CitationFilter, CitationStore, CitizenHistoryProvider, CitizenStore, RepositoryError,
};
use super::service::{CitationDraft, CitationService, CitationServiceError};

pub const AGENT_ID_HEADER: &str = "x-agent-id";
pub const AGENT_ROLE_HEADER: &str = "x-agent-role";

/// Citation creation body, in the shape the existing clients send.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCitationRequest {
    #[serde(default)]
    pub citoyen_id: Option<CitizenId>,
    #[serde(default)]
    pub citoyen_nom: String,
    #[serde(default)]
    pub citoyen_prenom: String,
    #[serde(default)]
    pub amende_id: Option<InfractionId>,
    #[serde(default)]
    pub amende_ids: Vec<InfractionId>,
    /// Accepted for compatibility; the amount is always recomputed.
    #[serde(default)]
    pub montant_applique: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lieu: Option<String>,
    #[serde(default)]
    pub est_recidive: Option<bool>,
}

impl From<CreateCitationRequest> for CitationDraft {
    fn from(request: CreateCitationRequest) -> Self {
        let amende_ids = if request.amende_ids.is_empty() {
            request.amende_id.into_iter().collect()
        } else {
            request.amende_ids
        };

        CitationDraft {
            citoyen_id: request.citoyen_id,
            citoyen_nom: request.citoyen_nom,
            citoyen_prenom: request.citoyen_prenom,
            amende_ids,
            description: request.description.unwrap_or_default(),
            lieu: request.lieu,
            est_recidive: request.est_recidive,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub statut: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CitationListQuery {
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default)]
    pub agent_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CitizenListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub citoyen_id: Option<u64>,
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
}

impl HistoryQuery {
    fn citizen_key(self) -> Option<CitizenKey> {
        if let Some(id) = self.citoyen_id {
            return Some(CitizenKey::Id(CitizenId(id)));
        }
        match (self.nom, self.prenom) {
            (Some(nom), Some(prenom)) if !nom.trim().is_empty() && !prenom.trim().is_empty() => {
                Some(CitizenKey::name(nom.trim(), prenom.trim()))
            }
            _ => None,
        }
    }
}

/// Caller identity forwarded by the authenticating gateway.
#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        };

        let id = header(AGENT_ID_HEADER).and_then(|raw| raw.parse::<u64>().ok());
        let role = header(AGENT_ROLE_HEADER).and_then(CallerRole::from_label);

        match (id, role) {
            (Some(id), Some(role)) => Ok(Caller {
                id: AgentId(id),
                role,
            }),
            _ => Err(error_payload(
                StatusCode::UNAUTHORIZED,
                "caller identity required".to_string(),
            )),
        }
    }
}

/// Router builder exposing the fine schedule, citations and citizen records.
pub fn citation_router<C, H, S, Z>(service: Arc<CitationService<C, H, S, Z>>) -> Router
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    Router::new()
        .route("/api/amendes", get(catalog_handler::<C, H, S, Z>))
        .route(
            "/api/amendes/categories/list",
            get(categories_handler::<C, H, S, Z>),
        )
        .route(
            "/api/rapports",
            get(list_handler::<C, H, S, Z>).post(create_handler::<C, H, S, Z>),
        )
        .route("/api/rapports/preview", post(preview_handler::<C, H, S, Z>))
        .route(
            "/api/rapports/stats/overview",
            get(overview_handler::<C, H, S, Z>),
        )
        .route("/api/rapports/:id", delete(delete_handler::<C, H, S, Z>))
        .route(
            "/api/rapports/:id/statut",
            patch(status_handler::<C, H, S, Z>),
        )
        .route(
            "/api/citoyens",
            get(citizens_handler::<C, H, S, Z>).post(create_citizen_handler::<C, H, S, Z>),
        )
        .route(
            "/api/citoyens/historique",
            get(history_handler::<C, H, S, Z>),
        )
        .route(
            "/api/citoyens/:id",
            get(casier_handler::<C, H, S, Z>)
                .put(update_citizen_handler::<C, H, S, Z>)
                .delete(delete_citizen_handler::<C, H, S, Z>),
        )
        .with_state(service)
}

type ServiceState<C, H, S, Z> = State<Arc<CitationService<C, H, S, Z>>>;

pub(crate) async fn catalog_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    _caller: Caller,
    Query(filter): Query<CatalogFilter>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.catalog(&filter) {
        Ok(definitions) => (StatusCode::OK, Json(definitions)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn categories_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    _caller: Caller,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.categories() {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn preview_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    _caller: Caller,
    Json(request): Json<CreateCitationRequest>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.preview(&CitationDraft::from(request)) {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    caller: Caller,
    Json(request): Json<CreateCitationRequest>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.record(&caller, CitationDraft::from(request)) {
        Ok(recorded) => {
            let payload = json!({
                "message": "Rapport créé avec succès",
                "id": recorded.citation.id,
                "montant_applique": recorded.citation.montant_applique,
                "est_recidive": recorded.citation.est_recidive,
                "assessment": recorded.assessment,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    _caller: Caller,
    Query(query): Query<CitationListQuery>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    let statut = match query.statut.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => match CitationStatus::from_label(raw) {
            Ok(statut) => Some(statut),
            Err(err) => return error_response(err.into()),
        },
    };
    let filter = CitationFilter {
        statut,
        agent_id: query.agent_id.map(AgentId),
        citizen: None,
    };

    match service.list(&filter) {
        Ok(citations) => (StatusCode::OK, Json(citations)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn overview_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    caller: Caller,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.overview(&caller, Utc::now().date_naive()) {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(request): Json<StatusRequest>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.set_status(&caller, CitationId(id), &request.statut) {
        Ok(citation) => {
            let payload = json!({
                "message": "Statut mis à jour",
                "statut": citation.statut,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.delete(&caller, CitationId(id)) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Rapport supprimé" }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    _caller: Caller,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    let Some(key) = query.citizen_key() else {
        return error_response(ValidationError::MissingCitizenName.into());
    };

    match service.history(&key) {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn citizens_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    _caller: Caller,
    Query(query): Query<CitizenListQuery>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.citizens(query.limit) {
        Ok(citizens) => (StatusCode::OK, Json(citizens)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_citizen_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    caller: Caller,
    Json(details): Json<CitizenDetails>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.create_citizen(&caller, details) {
        Ok(citizen) => {
            let payload = json!({ "message": "Citoyen créé", "id": citizen.id });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_citizen_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(details): Json<CitizenDetails>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.update_citizen(&caller, CitizenId(id), details) {
        Ok(_) => (StatusCode::OK, Json(json!({ "message": "Citoyen mis à jour" }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn casier_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    _caller: Caller,
    Path(id): Path<u64>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.casier(CitizenId(id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_citizen_handler<C, H, S, Z>(
    State(service): ServiceState<C, H, S, Z>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Response
where
    C: InfractionCatalog + 'static,
    H: CitizenHistoryProvider + 'static,
    S: CitationStore + 'static,
    Z: CitizenStore + 'static,
{
    match service.delete_citizen(&caller, CitizenId(id)) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Citoyen supprimé" }))).into_response(),
        Err(err) => error_response(err),
    }
}

/// HTTP status for a service error.
pub fn status_for(err: &CitationServiceError) -> StatusCode {
    match err {
        CitationServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        CitationServiceError::Lifecycle(LifecycleError::Unauthorized { .. }) => {
            StatusCode::FORBIDDEN
        }
        CitationServiceError::Lifecycle(
            LifecycleError::InvalidTransition { .. } | LifecycleError::CitizenHasCitations { .. },
        ) => StatusCode::CONFLICT,
        CitationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        CitationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        CitationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: CitationServiceError) -> Response {
    error_payload(status_for(&err), err.to_string())
}

fn error_payload(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
