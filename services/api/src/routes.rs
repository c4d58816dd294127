use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use case_sim::catalog::ReferenceCatalog;
use case_sim::simulation::{case_router, CaseRepository, CaseService, DialogueGenerator};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CatalogEntry {
    pub(crate) id: String,
    pub(crate) name: String,
}

/// Public index of the catalog ids the API accepts.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CatalogIndex {
    pub(crate) disorders: Vec<CatalogEntry>,
    pub(crate) symptoms: Vec<String>,
    pub(crate) treatments: Vec<CatalogEntry>,
    pub(crate) tests: Vec<CatalogEntry>,
}

impl CatalogIndex {
    pub(crate) fn from_catalog(catalog: &ReferenceCatalog) -> Self {
        let mut symptoms: Vec<String> = catalog
            .disorders()
            .iter()
            .flat_map(|disorder| disorder.symptoms.iter().map(|s| s.to_string()))
            .collect();
        symptoms.sort();
        symptoms.dedup();

        Self {
            disorders: catalog
                .disorders()
                .iter()
                .map(|d| CatalogEntry {
                    id: d.id.to_string(),
                    name: d.name.clone(),
                })
                .collect(),
            symptoms,
            treatments: catalog
                .treatments()
                .iter()
                .map(|t| CatalogEntry {
                    id: t.id.to_string(),
                    name: t.name.clone(),
                })
                .collect(),
            tests: catalog
                .tests()
                .iter()
                .map(|t| CatalogEntry {
                    id: t.id.to_string(),
                    name: t.name.clone(),
                })
                .collect(),
        }
    }
}

pub(crate) fn with_case_routes<R, D>(service: Arc<CaseService<R, D>>) -> axum::Router
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    let index = Arc::new(CatalogIndex::from_catalog(service.catalog()));

    case_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/catalog",
            axum::routing::get(move || catalog_endpoint(index.clone())),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn catalog_endpoint(index: Arc<CatalogIndex>) -> Json<CatalogIndex> {
    Json(CatalogIndex::clone(&index))
}
