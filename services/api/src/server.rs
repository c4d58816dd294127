use crate::cli::ServeArgs;
use crate::infra::{load_catalog, AppState, InMemoryCaseRepository};
use crate::routes::with_case_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use case_sim::config::AppConfig;
use case_sim::error::AppError;
use case_sim::simulation::{CaseService, LocalDialogue};
use case_sim::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let catalog = load_catalog(config.catalog_path.as_deref())?;
    let repository = Arc::new(InMemoryCaseRepository::default());
    let dialogue = Arc::new(LocalDialogue::new(catalog.clone()));
    let case_service = Arc::new(CaseService::new(
        repository,
        dialogue,
        catalog.clone(),
        &config.simulation,
    ));

    let app = with_case_routes(case_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        disorders = catalog.disorders().len(),
        treatment_wait_secs = config.simulation.treatment_wait.as_secs(),
        "case simulation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
