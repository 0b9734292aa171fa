use crate::cli::ServeArgs;
use crate::infra::{build_citation_service, load_catalog, seed_citizens, AppState};
use crate::routes::with_citation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rapports::config::{AppConfig, AppEnvironment};
use rapports::error::AppError;
use rapports::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(config.citations.catalog_csv.as_deref())?;
    info!(
        infractions = catalog.len(),
        source = ?config.citations.catalog_csv,
        "fine schedule loaded"
    );
    if catalog.is_empty() {
        warn!("fine schedule is empty; every citation will be recorded without penalties");
    }

    let (citation_service, _, citizens) =
        build_citation_service(catalog, config.citations.clone());
    if config.environment == AppEnvironment::Development {
        match seed_citizens(&citizens) {
            Ok(count) => info!(count, "sample citizens seeded"),
            Err(err) => warn!(error = %err, "sample citizens not seeded"),
        }
    }

    let app = with_citation_routes(citation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "citation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
