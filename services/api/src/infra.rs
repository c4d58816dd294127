use case_sim::catalog::ReferenceCatalog;
use case_sim::error::AppError;
use case_sim::simulation::{Case, CaseId, CaseRepository, GameMode, RepositoryError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local case store; contents are lost on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCaseRepository {
    cases: Arc<Mutex<HashMap<CaseId, Case>>>,
}

impl CaseRepository for InMemoryCaseRepository {
    fn insert(&self, case: Case) -> Result<Case, RepositoryError> {
        let mut guard = self.cases.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&case.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(case.id.clone(), case.clone());
        Ok(case)
    }

    fn save(&self, case: Case) -> Result<(), RepositoryError> {
        let mut guard = self.cases.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&case.id) {
            guard.insert(case.id.clone(), case);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn load(&self, id: &CaseId) -> Result<Option<Case>, RepositoryError> {
        let guard = self.cases.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(id).cloned())
    }
}

/// Loads the catalog from `path`, or the built-in standard catalog when absent.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<Arc<ReferenceCatalog>, AppError> {
    let catalog = match path {
        Some(path) => {
            info!(path = %path.display(), "loading reference catalog");
            ReferenceCatalog::from_path(path)?
        }
        None => ReferenceCatalog::standard()?,
    };
    Ok(Arc::new(catalog))
}

pub(crate) fn parse_mode(raw: &str) -> Result<GameMode, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "training" => Ok(GameMode::Training),
        "hard" => Ok(GameMode::Hard),
        "realistic" => Ok(GameMode::Realistic),
        other => Err(format!(
            "unknown game mode '{other}' (expected training, hard or realistic)"
        )),
    }
}
