use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::catalog::ReferenceCatalog;
use crate::config::SimulationConfig;
use crate::simulation::clock::Clock;
use crate::simulation::dialogue::{
    DialogueError, DialogueGenerator, DialogueReply, DialogueRequest,
};
use crate::simulation::domain::{
    Case, CaseId, DisorderId, GameMode, Patient, Personality,
};
use crate::simulation::random::RandomSource;
use crate::simulation::repository::{CaseRepository, RepositoryError};
use crate::simulation::service::CaseService;

pub(super) fn catalog() -> Arc<ReferenceCatalog> {
    Arc::new(ReferenceCatalog::standard().expect("standard catalog is valid"))
}

pub(super) fn started_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

pub(super) fn patient(disorder: &str, rapport_baseline: u8) -> Patient {
    Patient {
        name: "Marta Ríos".to_string(),
        age: 41,
        disorder: DisorderId::from(disorder),
        personality: Personality::Cooperative,
        rapport_baseline,
    }
}

pub(super) fn new_case(disorder: &str, rapport_baseline: u8) -> Case {
    Case::new(
        CaseId::from("case-test"),
        patient(disorder, rapport_baseline),
        GameMode::Hard,
    )
}

/// Draws `unit()` values from a script, then repeats `fallback`.
/// `between` always returns the low end of the range.
pub(super) struct ScriptedRandom {
    units: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    pub(super) fn new(units: &[f64]) -> Self {
        Self {
            units: units.iter().copied().collect(),
            fallback: 0.99,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(self.fallback)
    }

    fn between(&mut self, low: u16, _high: u16) -> u16 {
        low
    }
}

pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += chrono::Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) cases: Arc<Mutex<HashMap<CaseId, Case>>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, id: &CaseId) -> Option<Case> {
        self.cases
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl CaseRepository for MemoryRepository {
    fn insert(&self, case: Case) -> Result<Case, RepositoryError> {
        let mut guard = self.cases.lock().expect("repository mutex poisoned");
        if guard.contains_key(&case.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(case.id.clone(), case.clone());
        Ok(case)
    }

    fn save(&self, case: Case) -> Result<(), RepositoryError> {
        let mut guard = self.cases.lock().expect("repository mutex poisoned");
        guard.insert(case.id.clone(), case);
        Ok(())
    }

    fn load(&self, id: &CaseId) -> Result<Option<Case>, RepositoryError> {
        let guard = self.cases.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl CaseRepository for UnavailableRepository {
    fn insert(&self, _case: Case) -> Result<Case, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _case: Case) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn load(&self, _id: &CaseId) -> Result<Option<Case>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Generator that always answers with the same line and base score.
pub(super) struct CannedDialogue {
    pub(super) text: &'static str,
    pub(super) base_score: Option<u8>,
}

impl DialogueGenerator for CannedDialogue {
    async fn generate(&self, _request: DialogueRequest) -> Result<DialogueReply, DialogueError> {
        Ok(DialogueReply {
            text: self.text.to_string(),
            base_score: self.base_score,
        })
    }
}

pub(super) struct FailingDialogue;

impl DialogueGenerator for FailingDialogue {
    async fn generate(&self, _request: DialogueRequest) -> Result<DialogueReply, DialogueError> {
        Err(DialogueError::Unavailable("model endpoint refused".to_string()))
    }
}

/// Never answers within any configured timeout.
pub(super) struct StalledDialogue;

impl DialogueGenerator for StalledDialogue {
    async fn generate(&self, _request: DialogueRequest) -> Result<DialogueReply, DialogueError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(DialogueError::Unavailable("unreachable".to_string()))
    }
}

pub(super) struct Harness<D> {
    pub(super) service: CaseService<MemoryRepository, D>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness<D>(dialogue: D, rolls: &[f64]) -> Harness<D>
where
    D: DialogueGenerator + 'static,
{
    let repository = Arc::new(MemoryRepository::default());
    let clock = Arc::new(ManualClock::starting_at(started_at()));
    let service = CaseService::with_sources(
        repository.clone(),
        Arc::new(dialogue),
        catalog(),
        &SimulationConfig::default(),
        Box::new(ScriptedRandom::new(rolls)),
        clock.clone(),
    );
    Harness {
        service,
        repository,
        clock,
    }
}

pub(super) fn canned() -> CannedDialogue {
    CannedDialogue {
        text: "Pues... no sé por dónde empezar.",
        base_score: Some(60),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
