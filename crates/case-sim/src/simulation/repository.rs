use serde::Serialize;

use super::domain::{
    Case, CaseId, CaseStatus, DisorderId, FinalScore, GameMode, LifeAspect, Message, Personality,
    SymptomId, TestResult, TreatmentId,
};
use super::lifecycle::TreatmentResolution;
use crate::catalog::TreatmentFit;

/// Storage abstraction so the service can be exercised without a database.
/// Writes are last-write-wins; no transactions are assumed.
pub trait CaseRepository: Send + Sync {
    fn insert(&self, case: Case) -> Result<Case, RepositoryError>;
    fn save(&self, case: Case) -> Result<(), RepositoryError>;
    fn load(&self, id: &CaseId) -> Result<Option<Case>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("case already exists")]
    Conflict,
    #[error("case not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Patient details safe to show the trainee; the true disorder stays hidden.
#[derive(Debug, Clone, Serialize)]
pub struct PatientView {
    pub name: String,
    pub age: u8,
    pub personality: Personality,
}

/// Sanitized representation of a case for API responses.
///
/// Ground truth (`true_disorder`, `diagnosis_correct`) is only exposed once the
/// case has ended.
#[derive(Debug, Clone, Serialize)]
pub struct CaseView {
    pub case_id: CaseId,
    pub status: &'static str,
    pub mode: GameMode,
    pub patient: PatientView,
    pub rapport: u8,
    pub sessions: u32,
    pub selected_symptoms: Vec<SymptomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DisorderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<TreatmentId>,
    pub treatment_attempts: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_correct: Option<bool>,
    pub tests_results: Vec<TestResult>,
    pub life_aspects_explored: Vec<LifeAspect>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<FinalScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_disorder: Option<DisorderId>,
}

impl CaseView {
    pub fn from_case(case: &Case) -> Self {
        let ended = case.status.is_terminal();
        Self {
            case_id: case.id.clone(),
            status: case.status.label(),
            mode: case.mode,
            patient: PatientView {
                name: case.patient.name.clone(),
                age: case.patient.age,
                personality: case.patient.personality,
            },
            rapport: case.rapport,
            sessions: case.sessions,
            selected_symptoms: case.selected_symptoms.iter().cloned().collect(),
            diagnosis: case.diagnosis.clone(),
            diagnosis_correct: case.revealed_diagnosis_correct(),
            treatment: case.treatment.clone(),
            treatment_attempts: case.treatment_attempts,
            treatment_correct: case.treatment_correct,
            tests_results: case.tests_results.clone(),
            life_aspects_explored: case
                .life_aspects_explored
                .iter()
                .filter(|(_, explored)| **explored)
                .map(|(aspect, _)| *aspect)
                .collect(),
            messages: case.messages.clone(),
            final_score: case.final_score,
            true_disorder: ended.then(|| case.patient.disorder.clone()),
        }
    }
}

/// Treatment result as shown to the trainee.
///
/// How the treatment fits the true disorder, and the roll behind a chance
/// outcome, give the diagnosis away, so both stay hidden until the case ends.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionView {
    pub success: bool,
    pub attempt: u8,
    pub status: CaseStatus,
    pub rapport: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<TreatmentFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<FinalScore>,
}

impl ResolutionView {
    pub fn from_resolution(resolution: &TreatmentResolution) -> Self {
        let ended = resolution.status.is_terminal();
        Self {
            success: resolution.outcome.success,
            attempt: resolution.outcome.attempt,
            status: resolution.status,
            rapport: resolution.rapport,
            fit: ended.then_some(resolution.outcome.fit),
            roll: resolution.outcome.roll.filter(|_| ended),
            final_score: resolution.final_score,
        }
    }
}
