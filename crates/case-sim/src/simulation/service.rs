use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::info;

use super::clock::{Clock, SystemClock};
use super::dialogue::{
    generate_with_fallback, DialogueGenerator, DialogueRequest, GeneratedReply, LocalDialogue,
    ReplySource,
};
use super::domain::{
    Case, CaseId, DisorderId, GameMode, LifeAspect, Patient, SymptomId, TestId, TestResult,
    TreatmentId,
};
use super::hypotheses::Hypothesis;
use super::lifecycle::{
    CaseError, CaseLifecycle, ExchangeRecord, SymptomToggle, TreatmentResolution,
};
use super::questions::{score_question, score_question_with_base};
use super::random::{RandomSource, SeededRandom};
use super::repository::{CaseRepository, RepositoryError};
use super::treatment::TreatmentPolicy;
use crate::catalog::ReferenceCatalog;
use crate::config::{DialogueTimeouts, SimulationConfig};

/// Service composing the repository, catalog, lifecycle rules and dialogue collaborator.
///
/// Every mutating call loads the case, applies one lifecycle transition and
/// saves it back. Randomness and time come from injected sources.
pub struct CaseService<R, D> {
    repository: Arc<R>,
    dialogue: Arc<D>,
    fallback: LocalDialogue,
    catalog: Arc<ReferenceCatalog>,
    lifecycle: CaseLifecycle,
    timeouts: DialogueTimeouts,
    random: Mutex<Box<dyn RandomSource>>,
    clock: Arc<dyn Clock>,
    sequence: AtomicU64,
}

/// Reply to a question, with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskOutcome {
    #[serde(flatten)]
    pub exchange: ExchangeRecord,
    pub source: ReplySource,
}

impl<R, D> CaseService<R, D>
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    pub fn new(
        repository: Arc<R>,
        dialogue: Arc<D>,
        catalog: Arc<ReferenceCatalog>,
        config: &SimulationConfig,
    ) -> Self {
        Self::with_sources(
            repository,
            dialogue,
            catalog,
            config,
            Box::new(SeededRandom::from_entropy()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_sources(
        repository: Arc<R>,
        dialogue: Arc<D>,
        catalog: Arc<ReferenceCatalog>,
        config: &SimulationConfig,
        random: Box<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            dialogue,
            fallback: LocalDialogue::new(catalog.clone()),
            catalog,
            lifecycle: CaseLifecycle::new(config, TreatmentPolicy::default()),
            timeouts: config.dialogue_timeouts,
            random: Mutex::new(random),
            clock,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    fn next_case_id(&self) -> CaseId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        CaseId(format!("case-{id:06}"))
    }

    /// Open a new case for `patient`, persisted in the `new` status.
    pub fn intake(&self, patient: Patient, mode: GameMode) -> Result<Case, CaseServiceError> {
        if self.catalog.disorder(&patient.disorder).is_none() {
            return Err(CaseError::UnknownDisorder(patient.disorder).into());
        }

        let case = Case::new(self.next_case_id(), patient, mode);
        let stored = self.repository.insert(case)?;
        info!(case_id = %stored.id, mode = mode.label(), "case opened");
        Ok(stored)
    }

    pub fn get(&self, case_id: &CaseId) -> Result<Case, CaseServiceError> {
        let case = self
            .repository
            .load(case_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(case)
    }

    pub fn activate(&self, case_id: &CaseId) -> Result<Case, CaseServiceError> {
        self.mutate(case_id, |lifecycle, case| lifecycle.activate(case))
            .map(|(_, case)| case)
    }

    pub fn record_symptom(
        &self,
        case_id: &CaseId,
        symptom: SymptomId,
    ) -> Result<SymptomToggle, CaseServiceError> {
        self.mutate(case_id, |lifecycle, case| {
            lifecycle.record_symptom(case, &self.catalog, symptom)
        })
        .map(|(toggle, _)| toggle)
    }

    pub fn hypotheses(&self, case_id: &CaseId) -> Result<Vec<Hypothesis>, CaseServiceError> {
        let case = self.get(case_id)?;
        Ok(self.lifecycle.hypotheses(&case, &self.catalog))
    }

    pub fn submit_diagnosis(
        &self,
        case_id: &CaseId,
        disorder: DisorderId,
    ) -> Result<Case, CaseServiceError> {
        self.mutate(case_id, |lifecycle, case| {
            lifecycle.submit_diagnosis(case, &self.catalog, disorder)
        })
        .map(|(_, case)| case)
    }

    pub fn submit_treatment(
        &self,
        case_id: &CaseId,
        treatment: TreatmentId,
    ) -> Result<Case, CaseServiceError> {
        let now = self.clock.now();
        self.mutate(case_id, |lifecycle, case| {
            lifecycle.submit_treatment(case, &self.catalog, treatment, now)
        })
        .map(|(_, case)| case)
    }

    /// Poll for the pending treatment result; fails with `NotReady` until the wait elapses.
    pub fn resolve_treatment(
        &self,
        case_id: &CaseId,
    ) -> Result<TreatmentResolution, CaseServiceError> {
        let now = self.clock.now();
        self.mutate(case_id, |lifecycle, case| {
            self.with_random(|random| lifecycle.resolve_treatment(case, &self.catalog, now, random))
        })
        .map(|(resolution, _)| resolution)
    }

    pub fn cancel(&self, case_id: &CaseId) -> Result<Case, CaseServiceError> {
        self.mutate(case_id, |lifecycle, case| lifecycle.cancel(case))
            .map(|(_, case)| case)
    }

    pub fn record_life_aspect(
        &self,
        case_id: &CaseId,
        aspect: LifeAspect,
    ) -> Result<Case, CaseServiceError> {
        self.mutate(case_id, |lifecycle, case| {
            lifecycle.record_life_aspect(case, aspect)
        })
        .map(|(_, case)| case)
    }

    /// Apply a psychometric test; the raw score is simulated from the patient's true disorder.
    pub fn apply_test(
        &self,
        case_id: &CaseId,
        test: TestId,
    ) -> Result<TestResult, CaseServiceError> {
        self.mutate(case_id, |lifecycle, case| {
            let raw_score = self.simulated_raw_score(case, &test);
            lifecycle.apply_test(case, &self.catalog, test, raw_score)
        })
        .map(|(result, _)| result)
    }

    pub fn resume_session(&self, case_id: &CaseId) -> Result<Case, CaseServiceError> {
        self.mutate(case_id, |lifecycle, case| lifecycle.resume_session(case))
            .map(|(_, case)| case)
    }

    /// Ask the patient a question.
    ///
    /// The case is only written after the reply is in hand, so dropping this
    /// future early leaves the stored case untouched.
    pub async fn ask(
        &self,
        case_id: &CaseId,
        utterance: &str,
    ) -> Result<AskOutcome, CaseServiceError> {
        let snapshot = self.get(case_id)?;
        self.lifecycle.check_exchange(&snapshot)?;

        let request = DialogueRequest::from_case(&snapshot, utterance);
        let limit = self.timeouts.for_mode(snapshot.mode);
        let GeneratedReply { reply, source } =
            generate_with_fallback(self.dialogue.as_ref(), &self.fallback, request, limit).await;

        let quality_score = match reply.base_score {
            Some(base) => score_question_with_base(utterance, snapshot.mode, base),
            None => self.with_random(|random| score_question(utterance, snapshot.mode, random)),
        };

        let now = self.clock.now();
        let (exchange, _) = self.mutate(case_id, |lifecycle, case| {
            lifecycle.record_exchange(case, utterance, reply.text, quality_score, now)
        })?;

        Ok(AskOutcome { exchange, source })
    }

    fn mutate<T>(
        &self,
        case_id: &CaseId,
        apply: impl FnOnce(&CaseLifecycle, &mut Case) -> Result<T, CaseError>,
    ) -> Result<(T, Case), CaseServiceError> {
        let mut case = self.get(case_id)?;
        let value = apply(&self.lifecycle, &mut case)?;
        self.repository.save(case.clone())?;
        Ok((value, case))
    }

    fn with_random<T>(&self, draw: impl FnOnce(&mut dyn RandomSource) -> T) -> T {
        let mut random = self.random.lock().unwrap_or_else(PoisonError::into_inner);
        draw(&mut **random)
    }

    /// Highest band when the test targets the true disorder, lowest otherwise.
    /// Unknown tests yield 0 and are rejected by the lifecycle.
    fn simulated_raw_score(&self, case: &Case, test: &TestId) -> u16 {
        let Some(definition) = self.catalog.test(test) else {
            return 0;
        };
        let band = if definition.targets.contains(&case.patient.disorder) {
            definition.highest_band()
        } else {
            definition.lowest_band()
        };
        match band {
            Some(band) => self.with_random(|random| random.between(band.min, band.max)),
            None => 0,
        }
    }
}

/// Error raised by the case service.
#[derive(Debug, thiserror::Error)]
pub enum CaseServiceError {
    #[error(transparent)]
    Case(#[from] CaseError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
